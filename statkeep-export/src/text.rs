use std::{io::Write, time::SystemTime};

use statkeep_core::{ExportError, ItemList, Keeper, Scalar, StatisticsVisitor};

use crate::format;

/// Writes an export pass as plain text lines, one line per statistic.
///
/// Lines are prefixed with the dotted path of the group:
/// ```text
/// statistics at 2021-05-17 20:20:20.000 since 2021-05-17 19:20:20.000
/// adapter1 messagesReceived=5
/// adapter1.pipe duration count=3 min=10.0 ... | interval count=1 min=20.0 ...
/// ```
#[derive(Debug)]
pub struct TextSink<W> {
    writer: W,
    line: String,
}

/// A context of [`TextSink`], the path of the group.
#[derive(Debug, Clone, Default)]
pub struct TextContext {
    path: String,
}

impl<W: Write> TextSink<W> {
    /// Creates a sink writing into `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            line: String::new(),
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// The underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    fn push_items<L: ItemList + ?Sized>(&mut self, list: &L) -> Result<(), ExportError> {
        for index in 0..list.item_count() {
            let item = list.item(index)?;
            self.line.push(' ');
            self.line.push_str(&item.name);
            self.line.push('=');
            item.kind.format_to(&mut self.line, item.value);
        }
        Ok(())
    }

    fn flush_line(&mut self) -> Result<(), ExportError> {
        self.line.push('\n');
        let result = self.writer.write_all(self.line.as_bytes());
        self.line.clear();
        result.map_err(Into::into)
    }
}

impl<W: Write> StatisticsVisitor for TextSink<W> {
    type Context = TextContext;

    fn start(
        &mut self,
        now: SystemTime,
        main_mark: SystemTime,
        _detail_mark: Option<SystemTime>,
    ) -> Result<TextContext, ExportError> {
        self.line = format!(
            "statistics at {} since {}",
            format::timestamp(now),
            format::timestamp(main_mark)
        );
        self.flush_line()?;
        Ok(TextContext::default())
    }

    fn open_group(
        &mut self,
        parent: &mut TextContext,
        name: Option<&str>,
        kind: &str,
    ) -> Result<TextContext, ExportError> {
        Ok(TextContext {
            path: format::child_path(&parent.path, name, kind),
        })
    }

    fn handle_scalar(
        &mut self,
        ctx: &mut TextContext,
        name: &str,
        value: Scalar,
    ) -> Result<(), ExportError> {
        self.line = format!("{} {name}={}", ctx.path, format::scalar(value));
        self.flush_line()
    }

    fn handle_keeper(
        &mut self,
        ctx: &mut TextContext,
        keeper: &dyn Keeper,
    ) -> Result<(), ExportError> {
        let interval = keeper.interval()?;

        self.line.clear();
        self.line.push_str(&ctx.path);
        self.line.push(' ');
        self.line.push_str(keeper.name());
        self.push_items(keeper)?;
        self.line.push_str(" | interval");
        self.push_items(&interval)?;
        self.flush_line()
    }

    fn close_group(&mut self, _ctx: TextContext) -> Result<(), ExportError> {
        Ok(())
    }

    fn end(&mut self, _ctx: TextContext) -> Result<(), ExportError> {
        self.writer.flush().map_err(Into::into)
    }
}
