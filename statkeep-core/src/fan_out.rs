//! A visitor broadcasting a pass to several sinks.

use std::{any::Any, time::SystemTime};

use tracing::warn;

use crate::{
    errors::ExportError,
    keeper::Keeper,
    visitor::{Scalar, StatisticsVisitor},
};

type Slot = Box<dyn Any + Send>;

// === FanOut ===

/// Broadcasts every call to registered handlers in registration order.
///
/// Each handler gets back exactly the contexts it has returned, because
/// [`FanOutContext`] owns one slot per handler and is bound to the pass.
/// A failed handler aborts the call: the rest of handlers aren't invoked.
///
/// Handlers can be added only between passes.
#[derive(Default)]
pub struct FanOut {
    handlers: Vec<Handler>,
    active_pass: Option<u64>,
    next_pass: u64,
}

struct Handler {
    name: &'static str,
    visitor: Box<dyn ErasedVisitor>,
}

/// A context of [`FanOut`], holding contexts of all handlers.
pub struct FanOutContext {
    pass: u64,
    slots: Vec<Slot>,
}

impl FanOut {
    /// Creates a composite without handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new handler.
    ///
    /// Fails with [`ExportError::PassInProgress`] between `start` and `end`.
    pub fn add_handler<V>(&mut self, visitor: V) -> Result<(), ExportError>
    where
        V: StatisticsVisitor + Send + 'static,
        V::Context: Send + 'static,
    {
        if self.active_pass.is_some() {
            return Err(ExportError::PassInProgress);
        }

        self.handlers.push(Handler {
            name: std::any::type_name::<V>(),
            visitor: Box::new(visitor),
        });
        Ok(())
    }

    /// The number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Whether a pass is in progress.
    pub fn is_passing(&self) -> bool {
        self.active_pass.is_some()
    }

    fn check(&self, ctx: &FanOutContext) -> Result<(), ExportError> {
        if self.active_pass != Some(ctx.pass) || ctx.slots.len() != self.handlers.len() {
            return Err(ExportError::ForeignContext);
        }
        Ok(())
    }

    /// Calls `f` for every pair of a handler and its slot.
    fn broadcast(
        &mut self,
        ctx: &mut FanOutContext,
        mut f: impl FnMut(&mut dyn ErasedVisitor, &mut Slot) -> Result<(), ExportError>,
    ) -> Result<(), ExportError> {
        self.check(ctx)?;

        for (handler, slot) in self.handlers.iter_mut().zip(&mut ctx.slots) {
            f(&mut *handler.visitor, slot).map_err(|err| handler.failed(err))?;
        }
        Ok(())
    }

    /// Calls `f` for every pair of a handler and its slot, consuming slots.
    fn unwind(
        &mut self,
        ctx: FanOutContext,
        mut f: impl FnMut(&mut dyn ErasedVisitor, Slot) -> Result<(), ExportError>,
    ) -> Result<(), ExportError> {
        for (handler, slot) in self.handlers.iter_mut().zip(ctx.slots) {
            f(&mut *handler.visitor, slot).map_err(|err| handler.failed(err))?;
        }
        Ok(())
    }
}

impl Handler {
    fn failed(&self, err: ExportError) -> ExportError {
        warn!(handler = self.name, error = %err, "export handler failed");
        err
    }
}

impl StatisticsVisitor for FanOut {
    type Context = FanOutContext;

    fn start(
        &mut self,
        now: SystemTime,
        main_mark: SystemTime,
        detail_mark: Option<SystemTime>,
    ) -> Result<FanOutContext, ExportError> {
        if self.active_pass.is_some() {
            return Err(ExportError::PassInProgress);
        }

        let pass = self.next_pass;
        self.next_pass += 1;

        let mut slots = Vec::with_capacity(self.handlers.len());
        for handler in &mut self.handlers {
            let slot = handler
                .visitor
                .start_erased(now, main_mark, detail_mark)
                .map_err(|err| handler.failed(err))?;
            slots.push(slot);
        }

        self.active_pass = Some(pass);
        Ok(FanOutContext { pass, slots })
    }

    fn open_group(
        &mut self,
        parent: &mut FanOutContext,
        name: Option<&str>,
        kind: &str,
    ) -> Result<FanOutContext, ExportError> {
        let mut slots = Vec::with_capacity(self.handlers.len());
        self.broadcast(parent, |visitor, parent| {
            slots.push(visitor.open_group_erased(parent, name, kind)?);
            Ok(())
        })?;

        Ok(FanOutContext {
            pass: parent.pass,
            slots,
        })
    }

    fn handle_scalar(
        &mut self,
        ctx: &mut FanOutContext,
        name: &str,
        value: Scalar,
    ) -> Result<(), ExportError> {
        self.broadcast(ctx, |visitor, slot| {
            visitor.handle_scalar_erased(slot, name, value)
        })
    }

    fn handle_keeper(
        &mut self,
        ctx: &mut FanOutContext,
        keeper: &dyn Keeper,
    ) -> Result<(), ExportError> {
        self.broadcast(ctx, |visitor, slot| {
            visitor.handle_keeper_erased(slot, keeper)
        })
    }

    fn close_group(&mut self, ctx: FanOutContext) -> Result<(), ExportError> {
        self.check(&ctx)?;
        self.unwind(ctx, |visitor, slot| visitor.close_group_erased(slot))
    }

    fn end(&mut self, ctx: FanOutContext) -> Result<(), ExportError> {
        self.check(&ctx)?;
        // The pass is over even if some handler fails.
        self.active_pass = None;
        self.unwind(ctx, |visitor, slot| visitor.end_erased(slot))
    }
}

// === ErasedVisitor ===

/// [`StatisticsVisitor`] with type-erased contexts.
trait ErasedVisitor: Send {
    fn start_erased(
        &mut self,
        now: SystemTime,
        main_mark: SystemTime,
        detail_mark: Option<SystemTime>,
    ) -> Result<Slot, ExportError>;

    fn open_group_erased(
        &mut self,
        parent: &mut Slot,
        name: Option<&str>,
        kind: &str,
    ) -> Result<Slot, ExportError>;

    fn handle_scalar_erased(
        &mut self,
        ctx: &mut Slot,
        name: &str,
        value: Scalar,
    ) -> Result<(), ExportError>;

    fn handle_keeper_erased(
        &mut self,
        ctx: &mut Slot,
        keeper: &dyn Keeper,
    ) -> Result<(), ExportError>;

    fn close_group_erased(&mut self, ctx: Slot) -> Result<(), ExportError>;

    fn end_erased(&mut self, ctx: Slot) -> Result<(), ExportError>;
}

fn downcast_mut<C: 'static>(slot: &mut Slot) -> Result<&mut C, ExportError> {
    slot.downcast_mut().ok_or(ExportError::ForeignContext)
}

fn downcast<C: 'static>(slot: Slot) -> Result<C, ExportError> {
    slot.downcast()
        .map(|ctx| *ctx)
        .map_err(|_| ExportError::ForeignContext)
}

impl<V> ErasedVisitor for V
where
    V: StatisticsVisitor + Send,
    V::Context: Send + 'static,
{
    fn start_erased(
        &mut self,
        now: SystemTime,
        main_mark: SystemTime,
        detail_mark: Option<SystemTime>,
    ) -> Result<Slot, ExportError> {
        let ctx = self.start(now, main_mark, detail_mark)?;
        Ok(Box::new(ctx))
    }

    fn open_group_erased(
        &mut self,
        parent: &mut Slot,
        name: Option<&str>,
        kind: &str,
    ) -> Result<Slot, ExportError> {
        let ctx = self.open_group(downcast_mut(parent)?, name, kind)?;
        Ok(Box::new(ctx))
    }

    fn handle_scalar_erased(
        &mut self,
        ctx: &mut Slot,
        name: &str,
        value: Scalar,
    ) -> Result<(), ExportError> {
        self.handle_scalar(downcast_mut(ctx)?, name, value)
    }

    fn handle_keeper_erased(
        &mut self,
        ctx: &mut Slot,
        keeper: &dyn Keeper,
    ) -> Result<(), ExportError> {
        self.handle_keeper(downcast_mut(ctx)?, keeper)
    }

    fn close_group_erased(&mut self, ctx: Slot) -> Result<(), ExportError> {
        self.close_group(downcast(ctx)?)
    }

    fn end_erased(&mut self, ctx: Slot) -> Result<(), ExportError> {
        self.end(downcast(ctx)?)
    }
}

#[cfg(test)]
mod tests {
    use std::time::UNIX_EPOCH;

    use super::*;
    use crate::{
        keeper::MetricsKeeper,
        visitor::recorder::{Events, Recorder},
    };

    fn fan_out(recorders: impl IntoIterator<Item = Recorder>) -> FanOut {
        let mut fan_out = FanOut::new();
        for recorder in recorders {
            fan_out.add_handler(recorder).unwrap();
        }
        fan_out
    }

    #[test]
    fn lockstep() {
        let events = Events::default();
        let mut fan_out = fan_out([Recorder::new("a", &events), Recorder::new("b", &events)]);
        let keeper = MetricsKeeper::durations("duration");

        let mut session = fan_out.start(UNIX_EPOCH, UNIX_EPOCH, None).unwrap();
        let mut group = fan_out
            .open_group(&mut session, Some("adapter1"), "adapter")
            .unwrap();
        fan_out
            .handle_scalar(&mut group, "count", Scalar::Integer(5))
            .unwrap();
        fan_out.handle_keeper(&mut group, &keeper).unwrap();
        fan_out.close_group(group).unwrap();
        fan_out.end(session).unwrap();

        assert_eq!(
            *events.lock(),
            [
                "a start details=false -> 1",
                "b start details=false -> 1",
                "a open adapter1:adapter in 1 -> 2",
                "b open adapter1:adapter in 1 -> 2",
                "a scalar count=5 in 2",
                "b scalar count=5 in 2",
                "a keeper duration count=0 in 2",
                "b keeper duration count=0 in 2",
                "a close 2",
                "b close 2",
                "a end 1",
                "b end 1",
            ]
        );
        assert!(!fan_out.is_passing());
    }

    #[test]
    fn contexts_are_paired() {
        let events = Events::default();
        let mut fan_out = fan_out([
            Recorder::new("a", &events).numbered_after(100),
            Recorder::new("b", &events).numbered_after(200),
        ]);

        let mut session = fan_out.start(UNIX_EPOCH, UNIX_EPOCH, None).unwrap();
        let first = fan_out.open_group(&mut session, Some("x"), "g").unwrap();
        let second = fan_out.open_group(&mut session, Some("y"), "g").unwrap();

        // Closed in the reverse order of opening, contexts follow.
        fan_out.close_group(second).unwrap();
        fan_out.close_group(first).unwrap();
        fan_out.end(session).unwrap();

        assert_eq!(
            *events.lock(),
            [
                "a start details=false -> 101",
                "b start details=false -> 201",
                "a open x:g in 101 -> 102",
                "b open x:g in 201 -> 202",
                "a open y:g in 101 -> 103",
                "b open y:g in 201 -> 203",
                "a close 103",
                "b close 203",
                "a close 102",
                "b close 202",
                "a end 101",
                "b end 201",
            ]
        );
    }

    #[test]
    fn swapped_slots_are_rejected() {
        let events = Events::default();
        let mut fan_out = fan_out([
            Recorder::new("a", &events).numbered_after(100),
            Recorder::new("b", &events).numbered_after(200),
        ]);

        let mut session = fan_out.start(UNIX_EPOCH, UNIX_EPOCH, None).unwrap();
        let mut group = fan_out.open_group(&mut session, Some("x"), "g").unwrap();
        group.slots.swap(0, 1);

        assert!(matches!(
            fan_out.close_group(group),
            Err(ExportError::ForeignContext)
        ));
        assert!(!events.lock().iter().any(|event| event.contains("close")));
        fan_out.end(session).unwrap();
    }

    #[test]
    fn fail_fast() {
        let events = Events::default();
        let mut fan_out = fan_out([
            Recorder::new("a", &events),
            Recorder::new("b", &events).failing_on("handle_scalar"),
            Recorder::new("c", &events),
        ]);

        let mut session = fan_out.start(UNIX_EPOCH, UNIX_EPOCH, None).unwrap();
        let mut group = fan_out.open_group(&mut session, None, "root").unwrap();
        events.lock().clear();

        let err = fan_out
            .handle_scalar(&mut group, "count", Scalar::Integer(1))
            .unwrap_err();
        assert_eq!(err.to_string(), "sink b failed: handle_scalar failed");
        assert_eq!(*events.lock(), ["a scalar count=1 in 2"]);

        fan_out.close_group(group).unwrap();
        fan_out.end(session).unwrap();
    }

    #[test]
    fn handlers_are_frozen_during_pass() {
        let events = Events::default();
        let mut fan_out = fan_out([Recorder::new("a", &events)]);

        let session = fan_out.start(UNIX_EPOCH, UNIX_EPOCH, None).unwrap();
        assert!(matches!(
            fan_out.add_handler(Recorder::new("b", &events)),
            Err(ExportError::PassInProgress)
        ));
        assert!(matches!(
            fan_out.start(UNIX_EPOCH, UNIX_EPOCH, None),
            Err(ExportError::PassInProgress)
        ));
        fan_out.end(session).unwrap();

        fan_out.add_handler(Recorder::new("b", &events)).unwrap();
        assert_eq!(fan_out.len(), 2);
    }

    #[test]
    fn foreign_context() {
        let events = Events::default();
        let mut fan_out = fan_out([Recorder::new("a", &events)]);

        let mut stale = fan_out.start(UNIX_EPOCH, UNIX_EPOCH, None).unwrap();
        let group = fan_out.open_group(&mut stale, None, "root").unwrap();
        fan_out.close_group(group).unwrap();
        fan_out.end(stale).unwrap();

        let mut session = fan_out.start(UNIX_EPOCH, UNIX_EPOCH, None).unwrap();
        let mut other = FanOutContext {
            pass: session.pass + 1,
            slots: Vec::new(),
        };
        assert!(matches!(
            fan_out.handle_scalar(&mut other, "count", Scalar::Integer(1)),
            Err(ExportError::ForeignContext)
        ));
        assert!(matches!(
            fan_out.open_group(&mut other, None, "root"),
            Err(ExportError::ForeignContext)
        ));

        let group = fan_out.open_group(&mut session, None, "root").unwrap();
        fan_out.close_group(group).unwrap();
        fan_out.end(session).unwrap();
    }

    #[test]
    fn nested_fan_out() {
        let events = Events::default();
        let inner = fan_out([Recorder::new("inner", &events)]);
        let mut outer = fan_out([Recorder::new("outer", &events)]);
        outer.add_handler(inner).unwrap();

        let session = outer.start(UNIX_EPOCH, UNIX_EPOCH, Some(UNIX_EPOCH)).unwrap();
        outer.end(session).unwrap();

        assert_eq!(
            *events.lock(),
            [
                "outer start details=true -> 1",
                "inner start details=true -> 1",
                "outer end 1",
                "inner end 1",
            ]
        );
    }
}
