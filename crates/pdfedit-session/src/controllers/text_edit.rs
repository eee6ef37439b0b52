//! In-place text editing
//!
//! An edit owns the open action from start to commit or cancel. Re-opening an
//! existing element removes its operation right away, so the engine never
//! holds two operations for the same visible text. Cancelling aborts the
//! action, which re-issues that operation unchanged.

use std::time::{Duration, Instant};

use pdfedit_ops::{OpId, TextStyle};

use crate::engine::{DocumentEngine, TextRun};
use crate::error::{Result, SessionError};
use crate::geometry::{to_doc_space, DocRect, PixelRect};
use crate::history::Action;
use crate::overlay::{ElementContent, ElementId};

use super::EditContext;

const CHAR_WIDTH_EM: f64 = 0.6;
const LINE_HEIGHT_EM: f64 = 1.2;

/// What a committed edit produces
#[derive(Debug, Clone, PartialEq)]
pub enum TextMode {
    /// Inserted text
    Insert,
    /// Replacement for text covered by a redaction
    Replace {
        original_rect: DocRect,
        original_text: String,
    },
}

#[derive(Debug)]
pub struct TextEdit {
    element: ElementId,
    page: u32,
    text: String,
    style: TextStyle,
    mode: TextMode,
    reopened: Option<OpId>,
    commit_at: Option<Instant>,
}

impl TextEdit {
    /// Open an empty editor over `rect`
    pub fn begin_new<E: DocumentEngine + ?Sized>(
        ctx: &mut EditContext<'_, E>,
        page: u32,
        rect: PixelRect,
    ) -> Result<Self> {
        ctx.viewports.get(page)?;
        ctx.log.begin_action("text")?;
        let style = ctx.config.default_style.clone();
        let element = ctx.overlay.create(
            page,
            rect,
            ElementContent::Text {
                text: String::new(),
                style: style.clone(),
            },
        );
        ctx.overlay.get_mut(element)?.editing = true;
        tracing::debug!(page, element = element.0, "text edit started");
        Ok(Self {
            element,
            page,
            text: String::new(),
            style,
            mode: TextMode::Insert,
            reopened: None,
            commit_at: None,
        })
    }

    /// Re-open a text, replaced-text or redaction element. `runs` are the
    /// page's existing text runs, used to seed the style over a redaction.
    pub fn reopen<E: DocumentEngine + ?Sized>(
        ctx: &mut EditContext<'_, E>,
        element: ElementId,
        runs: &[TextRun],
    ) -> Result<Self> {
        let el = ctx
            .overlay
            .get(element)
            .cloned()
            .ok_or(SessionError::UnknownElement(element))?;
        let viewport = ctx.viewports.get(el.page)?;

        let (label, text, style, mode) = match &el.content {
            ElementContent::Text { text, style } => ("text", text.clone(), style.clone(), TextMode::Insert),
            ElementContent::Replaced {
                original_rect,
                original_text,
                text,
                style,
            } => (
                "replace",
                text.clone(),
                style.clone(),
                TextMode::Replace {
                    original_rect: *original_rect,
                    original_text: original_text.clone(),
                },
            ),
            ElementContent::Opaque { .. } => {
                let original_rect = to_doc_space(&viewport, &el.rect);
                let covered: Vec<&TextRun> =
                    runs.iter().filter(|run| run.rect.intersects(&original_rect)).collect();
                let style = seed_style(&ctx.config.default_style, covered.first().copied());
                let original_text = covered
                    .iter()
                    .map(|run| run.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                (
                    "replace",
                    String::new(),
                    style,
                    TextMode::Replace {
                        original_rect,
                        original_text,
                    },
                )
            }
            other => {
                return Err(SessionError::sequencing(format!(
                    "{:?} element has no editable text",
                    other.kind()
                )))
            }
        };

        ctx.log.begin_action(label)?;
        let reopened = ctx.overlay.handle_of(element);
        let displaced = ctx
            .overlay
            .displace_element(&mut *ctx.log, &mut *ctx.engine, element);
        if let Err(err) = displaced {
            ctx.rollback(element, Some(el));
            return Err(err);
        }
        ctx.overlay.get_mut(element)?.editing = true;
        tracing::debug!(element = element.0, handle = ?reopened, label, "text edit reopened");

        Ok(Self {
            element,
            page: el.page,
            text,
            style,
            mode,
            reopened,
            commit_at: None,
        })
    }

    pub fn element(&self) -> ElementId {
        self.element
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn style(&self) -> &TextStyle {
        &self.style
    }

    pub fn mode(&self) -> &TextMode {
        &self.mode
    }

    /// Handle of the operation this edit replaced, if it re-opened one
    pub fn reopened(&self) -> Option<OpId> {
        self.reopened
    }

    pub fn set_text<E: DocumentEngine + ?Sized>(&mut self, ctx: &mut EditContext<'_, E>, text: &str) {
        self.text = text.to_string();
        self.sync(ctx);
    }

    pub fn insert_newline<E: DocumentEngine + ?Sized>(&mut self, ctx: &mut EditContext<'_, E>) {
        self.text.push('\n');
        self.sync(ctx);
    }

    /// Restyle the in-progress text. Nothing reaches the engine before commit.
    pub fn set_style<E: DocumentEngine + ?Sized>(&mut self, ctx: &mut EditContext<'_, E>, style: TextStyle) {
        self.style = style;
        self.sync(ctx);
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Schedule a commit `delay` after the editor lost focus
    pub fn blur(&mut self, now: Instant, delay: Duration) {
        self.commit_at = Some(now + delay);
    }

    /// Focus came back before the pending commit fired
    pub fn focus(&mut self) {
        self.commit_at = None;
    }

    pub fn commit_pending(&self) -> bool {
        self.commit_at.is_some()
    }

    pub fn commit_due(&self, now: Instant) -> bool {
        self.commit_at.is_some_and(|at| now >= at)
    }

    /// Commit the text as one action. Empty text cancels instead and yields
    /// no action.
    pub fn commit<E: DocumentEngine + ?Sized>(self, ctx: &mut EditContext<'_, E>) -> Result<Option<Action>> {
        if self.is_empty() {
            self.cancel(ctx);
            return Ok(None);
        }

        let result = self.finalize(ctx);
        let action = ctx.finish(self.element, None, result)?;
        tracing::debug!(element = self.element.0, "text edit committed");
        Ok(action)
    }

    /// Drop the editor. A re-opened element comes back unmodified.
    pub fn cancel<E: DocumentEngine + ?Sized>(self, ctx: &mut EditContext<'_, E>) {
        tracing::debug!(element = self.element.0, reopened = ?self.reopened, "text edit cancelled");
        ctx.rollback(self.element, None);
    }

    fn finalize<E: DocumentEngine + ?Sized>(&self, ctx: &mut EditContext<'_, E>) -> Result<()> {
        let viewport = ctx.viewports.get(self.page)?;
        let (width, height) = estimate_text_size(&self.text, &self.style, viewport.scale);

        let el = ctx.overlay.get_mut(self.element)?;
        el.rect.width = el.rect.width.max(width);
        el.rect.height = el.rect.height.max(height);
        el.content = self.content();
        el.editing = false;

        ctx.commit_element(self.element).map(|_| ())
    }

    fn content(&self) -> ElementContent {
        match &self.mode {
            TextMode::Insert => ElementContent::Text {
                text: self.text.clone(),
                style: self.style.clone(),
            },
            TextMode::Replace {
                original_rect,
                original_text,
            } => ElementContent::Replaced {
                original_rect: *original_rect,
                original_text: original_text.clone(),
                text: self.text.clone(),
                style: self.style.clone(),
            },
        }
    }

    /// Mirror the editor into the element while typing
    fn sync<E: DocumentEngine + ?Sized>(&self, ctx: &mut EditContext<'_, E>) {
        let Ok(el) = ctx.overlay.get_mut(self.element) else {
            return;
        };
        if !matches!(el.content, ElementContent::Opaque { .. }) {
            el.content = self.content();
        }
    }
}

/// Rough pixel extent of `text` set in `style` at `scale`
pub fn estimate_text_size(text: &str, style: &TextStyle, scale: f64) -> (f64, f64) {
    let lines = text.split('\n');
    let (count, longest) = lines.fold((0usize, 0usize), |(count, longest), line| {
        (count + 1, longest.max(line.chars().count()))
    });
    let em = style.font_size * scale;
    (
        longest as f64 * em * CHAR_WIDTH_EM,
        count.max(1) as f64 * em * LINE_HEIGHT_EM,
    )
}

fn seed_style(default: &TextStyle, run: Option<&TextRun>) -> TextStyle {
    let Some(run) = run else {
        return default.clone();
    };
    TextStyle {
        font_size: if run.font.font_size > 0.0 {
            run.font.font_size
        } else {
            default.font_size
        },
        color: default.color.clone(),
        font_name: run.font.font_name.clone().or_else(|| default.font_name.clone()),
        is_italic: run.font.is_italic,
        is_bold: run.font.is_bold,
    }
}
