//! Message bodies exposed as a forward-only byte stream.
//!
//! Nothing is parsed until the first `read`. The parse result lives only
//! until the stream reports end of data; the next read starts over from
//! the file.

use std::collections::VecDeque;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;
use crate::model::message::Message;
use crate::parser::tree::parse_mime_tree_file;
use crate::parser::walker::DEFAULT_MAX_DEPTH;
use crate::render::html::{HtmlToText, PlainHtml};
use crate::render::select::select_content;
use crate::render::summary::render_structure;

/// What the stream produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyView {
    /// Selected content, as a reader would see it.
    #[default]
    Text,
    /// One line per MIME part.
    Structure,
}

/// Lazily parsed body of one message file.
pub struct MessageBody<H = PlainHtml> {
    path: PathBuf,
    view: BodyView,
    max_depth: usize,
    html: H,
    chunks: Option<VecDeque<Cursor<Vec<u8>>>>,
}

impl MessageBody<PlainHtml> {
    pub fn new(path: impl Into<PathBuf>, view: BodyView) -> Self {
        Self {
            path: path.into(),
            view,
            max_depth: DEFAULT_MAX_DEPTH,
            html: PlainHtml::default(),
            chunks: None,
        }
    }

    pub fn for_message(message: &Message, view: BodyView) -> Self {
        Self::new(message.path(), view)
    }
}

impl<H: HtmlToText> MessageBody<H> {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Replace the HTML reducer used for `text/html` parts.
    pub fn with_html<H2: HtmlToText>(self, html: H2) -> MessageBody<H2> {
        MessageBody {
            path: self.path,
            view: self.view,
            max_depth: self.max_depth,
            html,
            chunks: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn materialize(&self) -> Result<VecDeque<Cursor<Vec<u8>>>> {
        let tree = parse_mime_tree_file(&self.path, self.max_depth)?;
        let chunks: VecDeque<_> = match self.view {
            BodyView::Text => select_content(&tree, &self.html)
                .into_iter()
                .map(|r| Cursor::new(r.into_bytes()))
                .collect(),
            BodyView::Structure => VecDeque::from([Cursor::new(render_structure(&tree).into_bytes())]),
        };
        debug!(path = %self.path.display(), view = ?self.view, chunks = chunks.len(), "Materialized message body");
        Ok(chunks)
    }
}

impl<H: HtmlToText> Read for MessageBody<H> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let chunks = match self.chunks.take() {
            Some(chunks) => chunks,
            None => self.materialize()?,
        };
        let mut chunks = chunks;
        while let Some(front) = chunks.front_mut() {
            let n = front.read(buf)?;
            if n > 0 {
                self.chunks = Some(chunks);
                return Ok(n);
            }
            chunks.pop_front();
        }
        Ok(0)
    }
}
