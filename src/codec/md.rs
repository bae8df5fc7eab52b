use pulldown_cmark::{
    CodeBlockKind, CowStr, Event as MdEvent, HeadingLevel, Options, Parser as MdParser,
    Tag as MdTag, TagEnd as MdTagEnd, TextMergeStream,
};
use std::{
    collections::{BTreeSet, HashMap, HashSet},
    path::PathBuf,
};

use crate::{
    codec::{highlight::highlight, BodyCodec, RenderContext, RenderedBody},
    error::DocumentError,
    html::escape_html,
    paths::{is_remote, local_asset_path, to_anchor},
    xref::{find_mentions, parse_link_target},
};

pub use pulldown_cmark;

pub fn pepsite_md_options() -> Options {
    let mut md_options = Options::empty();
    // Enabled explicitly instead of Options::all() so output stays reproducible across
    // pulldown-cmark upgrades. Old-style footnotes report references without a definition,
    // which the GFM style silently renders as text.
    md_options.insert(Options::ENABLE_OLD_FOOTNOTES);
    md_options.insert(Options::ENABLE_STRIKETHROUGH);
    md_options.insert(Options::ENABLE_TABLES);
    md_options.insert(Options::ENABLE_TASKLISTS);
    md_options
}

/// Markdown body codec: pulldown-cmark does the markup conversion, this codec rewrites the
/// event stream on the way through (cross-references, highlighting, images, heading anchors).
#[derive(Debug, Default, Clone)]
pub struct MdCodec;

impl MdCodec {
    pub fn new() -> Self {
        MdCodec
    }
}

impl BodyCodec for MdCodec {
    fn render(&self, body: &str, ctx: &RenderContext<'_>) -> RenderedBody {
        let mut pass = BodyPass::new(ctx);
        for event in TextMergeStream::new(MdParser::new_ext(body, pepsite_md_options())) {
            pass.push(event);
        }
        pass.finish()
    }
}

struct CodeBuffer {
    lang: String,
    text: String,
}

struct ImageBuffer {
    dest: String,
    title: String,
    alt: String,
}

struct HeadingBuffer<'a> {
    level: HeadingLevel,
    id: Option<CowStr<'a>>,
    classes: Vec<CowStr<'a>>,
    attrs: Vec<(CowStr<'a>, Option<CowStr<'a>>)>,
    events: Vec<MdEvent<'a>>,
    text: String,
}

/// Single pass over the markdown events of one body.
struct BodyPass<'a, 'c> {
    ctx: &'c RenderContext<'c>,
    out: Vec<MdEvent<'a>>,
    code: Option<CodeBuffer>,
    in_plain_code: bool,
    image: Option<ImageBuffer>,
    heading: Option<HeadingBuffer<'a>>,
    /// One entry per open link; `false` when the start tag was dropped.
    links: Vec<bool>,
    /// Next suffix to try per base anchor.
    anchors: HashMap<String, usize>,
    /// Every id emitted so far, explicit or generated.
    taken_ids: HashSet<String>,
    footnote_refs: BTreeSet<String>,
    footnote_defs: BTreeSet<String>,
    unresolved: BTreeSet<u32>,
    result: RenderedBody,
    assets: BTreeSet<PathBuf>,
}

impl<'a, 'c> BodyPass<'a, 'c> {
    fn new(ctx: &'c RenderContext<'c>) -> Self {
        BodyPass {
            ctx,
            out: Vec::new(),
            code: None,
            in_plain_code: false,
            image: None,
            heading: None,
            links: Vec::new(),
            anchors: HashMap::new(),
            taken_ids: HashSet::new(),
            footnote_refs: BTreeSet::new(),
            footnote_defs: BTreeSet::new(),
            unresolved: BTreeSet::new(),
            result: RenderedBody::default(),
            assets: BTreeSet::new(),
        }
    }

    fn emit(&mut self, event: MdEvent<'a>) {
        match self.heading.as_mut() {
            Some(heading) => heading.events.push(event),
            None => self.out.push(event),
        }
    }

    fn unresolved(&mut self, number: u32) {
        if self.unresolved.insert(number) {
            tracing::debug!(
                "[MdCodec] document {} references unknown document {}",
                self.ctx.number,
                number
            );
            self.result
                .errors
                .push(DocumentError::UnresolvedReference { number });
        }
    }

    fn push(&mut self, event: MdEvent<'a>) {
        if let Some(code) = self.code.as_mut() {
            match event {
                MdEvent::Text(text) => code.text.push_str(&text),
                MdEvent::End(MdTagEnd::CodeBlock) => self.finish_code(),
                _ => {}
            }
            return;
        }

        if let Some(image) = self.image.as_mut() {
            match event {
                MdEvent::Text(text) | MdEvent::Code(text) => image.alt.push_str(&text),
                MdEvent::End(MdTagEnd::Image) => self.finish_image(),
                _ => {}
            }
            return;
        }

        if let (Some(heading), MdEvent::Text(text) | MdEvent::Code(text)) =
            (self.heading.as_mut(), &event)
        {
            heading.text.push_str(text);
        }

        match event {
            MdEvent::Start(MdTag::CodeBlock(CodeBlockKind::Fenced(info)))
                if !info.trim().is_empty() =>
            {
                let lang = info.split_whitespace().next().unwrap_or_default();
                self.code = Some(CodeBuffer {
                    lang: lang.to_string(),
                    text: String::new(),
                });
            }
            MdEvent::Start(MdTag::CodeBlock(kind)) => {
                self.in_plain_code = true;
                self.emit(MdEvent::Start(MdTag::CodeBlock(kind)));
            }
            MdEvent::End(MdTagEnd::CodeBlock) => {
                self.in_plain_code = false;
                self.emit(MdEvent::End(MdTagEnd::CodeBlock));
            }
            MdEvent::Start(MdTag::Heading {
                level,
                id,
                classes,
                attrs,
            }) => {
                self.heading = Some(HeadingBuffer {
                    level,
                    id,
                    classes,
                    attrs,
                    events: Vec::new(),
                    text: String::new(),
                });
            }
            MdEvent::End(MdTagEnd::Heading(level)) => self.finish_heading(level),
            MdEvent::Start(MdTag::Link {
                link_type,
                dest_url,
                title,
                id,
            }) => {
                let target = parse_link_target(&dest_url)
                    .map(|(number, fragment)| (number, fragment.map(str::to_string)));
                let Some((number, fragment)) = target else {
                    self.links.push(true);
                    self.emit(MdEvent::Start(MdTag::Link {
                        link_type,
                        dest_url,
                        title,
                        id,
                    }));
                    return;
                };
                match self
                    .ctx
                    .symbols
                    .resolve(self.ctx.number, number, fragment.as_deref())
                {
                    Ok(xref) => {
                        let title = if title.is_empty() {
                            self.ctx
                                .symbols
                                .get(number)
                                .map(|e| CowStr::from(e.title.clone()))
                                .unwrap_or(title)
                        } else {
                            title
                        };
                        self.links.push(true);
                        self.emit(MdEvent::Start(MdTag::Link {
                            link_type,
                            dest_url: CowStr::from(xref.url.clone()),
                            title,
                            id,
                        }));
                        self.result.references.push(xref);
                    }
                    Err(_) => {
                        self.links.push(false);
                        self.unresolved(number);
                    }
                }
            }
            MdEvent::End(MdTagEnd::Link) => {
                if self.links.pop().unwrap_or(true) {
                    self.emit(MdEvent::End(MdTagEnd::Link));
                }
            }
            MdEvent::Start(MdTag::Image {
                dest_url, title, ..
            }) => {
                self.image = Some(ImageBuffer {
                    dest: dest_url.to_string(),
                    title: title.to_string(),
                    alt: String::new(),
                });
            }
            MdEvent::Text(text) if self.links.is_empty() && !self.in_plain_code => {
                self.push_prose(text)
            }
            MdEvent::FootnoteReference(label) => {
                self.footnote_refs.insert(label.to_string());
                self.emit(MdEvent::FootnoteReference(label));
            }
            MdEvent::Start(MdTag::FootnoteDefinition(label)) => {
                self.footnote_defs.insert(label.to_string());
                self.emit(MdEvent::Start(MdTag::FootnoteDefinition(label)));
            }
            other => self.emit(other),
        }
    }

    /// Rewrite bare `PEP <n>` mentions in a run of prose into anchors.
    fn push_prose(&mut self, text: CowStr<'a>) {
        let mentions = find_mentions(&text);
        if mentions.is_empty() {
            self.emit(MdEvent::Text(text));
            return;
        }
        let mut last = 0;
        for mention in mentions {
            let xref = match self.ctx.symbols.resolve(self.ctx.number, mention.number, None) {
                Ok(xref) => xref,
                Err(_) => {
                    self.unresolved(mention.number);
                    continue;
                }
            };
            if mention.start > last {
                self.emit(MdEvent::Text(CowStr::from(
                    text[last..mention.start].to_string(),
                )));
            }
            let title = self
                .ctx
                .symbols
                .get(mention.number)
                .map(|e| e.title.as_str())
                .unwrap_or_default();
            self.emit(MdEvent::InlineHtml(CowStr::from(format!(
                "<a class=\"pep reference\" href=\"{}\" title=\"{}\">{}</a>",
                escape_html(&xref.url),
                escape_html(title),
                escape_html(&text[mention.start..mention.end])
            ))));
            self.result.references.push(xref);
            last = mention.end;
        }
        if last < text.len() {
            self.emit(MdEvent::Text(CowStr::from(text[last..].to_string())));
        }
    }

    fn finish_code(&mut self) {
        let Some(code) = self.code.take() else {
            return;
        };
        match highlight(&code.text, &code.lang) {
            Ok(html) => self.emit(MdEvent::Html(CowStr::from(html))),
            Err(e) => {
                tracing::warn!(
                    "[MdCodec] highlighting failed in document {}: {}",
                    self.ctx.number,
                    e
                );
                self.result.errors.push(DocumentError::Render(e.to_string()));
            }
        }
    }

    fn finish_image(&mut self) {
        let Some(image) = self.image.take() else {
            return;
        };
        let path_part = image.dest.split(['#', '?']).next().unwrap_or_default();
        let class = if path_part.to_lowercase().ends_with(".svg") {
            "vector"
        } else {
            "raster"
        };
        if !is_remote(&image.dest) && !image.dest.starts_with('/') {
            match local_asset_path(&image.dest) {
                Some(path) => {
                    self.assets.insert(path);
                }
                None => self.result.errors.push(DocumentError::MissingAsset {
                    src: image.dest.clone(),
                    reason: "image path leaves the document directory".to_string(),
                }),
            }
        }
        let title = if image.title.is_empty() {
            String::new()
        } else {
            format!(" title=\"{}\"", escape_html(&image.title))
        };
        self.emit(MdEvent::InlineHtml(CowStr::from(format!(
            "<img class=\"{class}\" src=\"{}\" alt=\"{}\"{title} loading=\"lazy\">",
            escape_html(&image.dest),
            escape_html(&image.alt)
        ))));
    }

    fn finish_heading(&mut self, level: HeadingLevel) {
        let Some(heading) = self.heading.take() else {
            self.emit(MdEvent::End(MdTagEnd::Heading(level)));
            return;
        };
        let id = match heading.id {
            Some(id) => {
                self.taken_ids.insert(id.to_string());
                id
            }
            None => CowStr::from(self.unique_anchor(&heading.text)),
        };
        self.out.push(MdEvent::Start(MdTag::Heading {
            level: heading.level,
            id: Some(id),
            classes: heading.classes,
            attrs: heading.attrs,
        }));
        self.out.extend(heading.events);
        self.out.push(MdEvent::End(MdTagEnd::Heading(level)));
    }

    fn unique_anchor(&mut self, text: &str) -> String {
        let mut anchor = to_anchor(text);
        if anchor.is_empty() {
            anchor = "section".to_string();
        }
        let next = self.anchors.entry(anchor.clone()).or_insert(0);
        loop {
            let candidate = if *next == 0 {
                anchor.clone()
            } else {
                format!("{anchor}-{next}")
            };
            *next += 1;
            if self.taken_ids.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    fn finish(mut self) -> RenderedBody {
        let undefined = self
            .footnote_refs
            .difference(&self.footnote_defs)
            .cloned()
            .collect::<Vec<String>>();
        for label in undefined {
            self.result
                .errors
                .push(DocumentError::UndefinedFootnote { label });
        }
        let mut html = String::new();
        pulldown_cmark::html::push_html(&mut html, self.out.into_iter());
        self.result.html = html;
        self.result.assets = self.assets.into_iter().collect();
        self.result
    }
}
