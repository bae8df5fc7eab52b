use rayon::{prelude::*, ThreadPoolBuilder};
use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Component, Path, PathBuf},
    sync::Arc,
};
use walkdir::WalkDir;

use crate::{
    codec::{
        diagnostic::{BuildSummary, DocumentReport},
        header::{parse_header, peek_number},
        highlight::theme_css,
        md::MdCodec,
        BodyCodec, RenderContext,
    },
    config::BuildConfig,
    document::DocumentHeader,
    error::{CorpusError, DocumentError, HeaderError, SiteError},
    html::{escape_html, header_table, stylesheet, write_page, SiteContext, STYLESHEET},
    index::{api_listing, build_indexes, sitemap},
    paths::{canonical_path, canonical_slug, page_file},
    redirect::RedirectTable,
    xref::SymbolTable,
};

pub const API_LISTING: &str = "api/peps.json";
pub const SITEMAP: &str = "sitemap.xml";
pub const REDIRECTS_JSON: &str = "redirects.json";
pub const REDIRECTS_NGINX: &str = "redirects.nginx.conf";

/// One source file as read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// Relative to the source directory; used in every report.
    pub path: PathBuf,
    /// Location on disk; images are looked up next to it.
    pub source_path: PathBuf,
    pub content: String,
}

/// Everything read for one build: the documents that could be read and the fatal errors for
/// those that could not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    pub documents: Vec<SourceDocument>,
    pub errors: Vec<CorpusError>,
}

impl Corpus {
    /// A corpus built from in-memory sources, as if each `(path, content)` pair had been read
    /// from `source_dir`.
    pub fn in_memory<I, P, S>(source_dir: &Path, sources: I) -> Corpus
    where
        I: IntoIterator<Item = (P, S)>,
        P: Into<PathBuf>,
        S: Into<String>,
    {
        let documents = sources
            .into_iter()
            .map(|(path, content)| {
                let path = path.into();
                SourceDocument {
                    source_path: source_dir.join(&path),
                    path,
                    content: content.into(),
                }
            })
            .collect();
        Corpus {
            documents,
            errors: Vec::new(),
        }
    }
}

/// The finished, not yet written, output tree.
#[derive(Debug, Clone)]
pub struct CompiledSite {
    /// Output path (relative to the output directory) -> file content.
    pub files: BTreeMap<PathBuf, String>,
    /// Output path -> source image to copy there.
    pub assets: BTreeMap<PathBuf, PathBuf>,
    pub symbols: Arc<SymbolTable>,
    pub redirects: RedirectTable,
    pub summary: BuildSummary,
}

/// A document whose header validated.
struct ParsedDocument<'a> {
    source: &'a SourceDocument,
    header: DocumentHeader,
    body: &'a str,
}

struct RenderedPage {
    number: u32,
    html: String,
    assets: Vec<(PathBuf, PathBuf)>,
}

/// Drives one build of the whole corpus.
///
/// ## Pipeline
///
/// 1. **Discover and read**: [SiteCompiler::discover] walks the source directory in sorted
///    order; [SiteCompiler::load_sources] reads every file. Unreadable files become
///    [CorpusError::Unreadable].
/// 2. **Parse headers** (parallel): malformed headers are fatal; a header with an unknown
///    status or type excludes only its own document.
/// 3. **Check the corpus**: duplicate numbers are detected across every document whose
///    number could be read. If any fatal error was found the build stops here, before
///    anything is rendered or written, and all fatal errors are returned together.
/// 4. **Freeze the symbol table** (pass 1 of cross-reference resolution).
/// 5. **Render** (parallel): every body is rendered against the frozen table (pass 2), while
///    the index pages and the redirect table are built alongside from the headers alone.
/// 6. **Write**: [SiteCompiler::write] writes the output tree.
///
/// Steps 1 to 5 do not touch the output directory, so an aborted build leaves it untouched.
/// Every document yields exactly one [DocumentReport] in the returned [BuildSummary].
pub struct SiteCompiler {
    config: BuildConfig,
    ctx: SiteContext,
    codec: Arc<dyn BodyCodec>,
}

impl SiteCompiler {
    pub fn new(config: BuildConfig) -> Result<Self, SiteError> {
        Self::with_codec(config, Arc::new(MdCodec::new()))
    }

    pub fn with_codec(config: BuildConfig, codec: Arc<dyn BodyCodec>) -> Result<Self, SiteError> {
        config.validate()?;
        if config.clean
            && resolve_dir(&config.source_dir)?.starts_with(resolve_dir(&config.output_dir)?)
        {
            return Err(SiteError::Config(format!(
                "refusing to clean {:?}: it contains the source directory",
                config.output_dir
            )));
        }
        let ctx = SiteContext::from_config(&config);
        Ok(SiteCompiler { config, ctx, codec })
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Every document file under the source directory, in sorted order.
    pub fn discover(&self) -> Result<Vec<PathBuf>, SiteError> {
        let source_dir = &self.config.source_dir;
        if !source_dir.is_dir() {
            return Err(SiteError::NotFound(format!(
                "source directory {source_dir:?} does not exist"
            )));
        }
        let mut paths = Vec::new();
        for entry in WalkDir::new(source_dir).sort_by_file_name() {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type().is_file()
                && self.config.is_document(path)
                && !path.starts_with(&self.config.output_dir)
            {
                paths.push(path.to_path_buf());
            }
        }
        tracing::info!(
            "[Compiler] discovered {} document(s) under {:?}",
            paths.len(),
            source_dir
        );
        Ok(paths)
    }

    /// Read the given files. Read failures are collected, not returned, so that a single
    /// build reports every fatal problem at once.
    pub async fn load_sources(&self, paths: Vec<PathBuf>) -> Corpus {
        let mut corpus = Corpus::default();
        for source_path in paths {
            let path = source_path
                .strip_prefix(&self.config.source_dir)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| source_path.clone());
            match tokio::fs::read_to_string(&source_path).await {
                Ok(content) => corpus.documents.push(SourceDocument {
                    path,
                    source_path,
                    content,
                }),
                Err(e) => {
                    tracing::error!("[Compiler] cannot read {:?}: {}", source_path, e);
                    corpus.errors.push(CorpusError::Unreadable {
                        path,
                        reason: e.to_string(),
                    });
                }
            }
        }
        corpus
    }

    /// Run the pipeline up to, but not including, writing files.
    ///
    /// Blocks the calling thread while the worker pool runs.
    pub fn compile(&self, corpus: Corpus) -> Result<CompiledSite, SiteError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(self.config.jobs.unwrap_or(0))
            .thread_name(|i| format!("pepsite-worker-{i}"))
            .build()?;
        tracing::debug!(
            "[Compiler] compiling on {} worker thread(s)",
            pool.current_num_threads()
        );
        pool.install(|| self.compile_in_pool(corpus))
    }

    fn compile_in_pool(&self, corpus: Corpus) -> Result<CompiledSite, SiteError> {
        let Corpus {
            mut documents,
            errors: mut fatal,
        } = corpus;
        documents.sort_by(|a, b| a.path.cmp(&b.path));

        let outcomes = documents
            .par_iter()
            .map(|source| (source, parse_header(&source.content)))
            .collect::<Vec<_>>();

        let mut parsed = Vec::new();
        let mut reports = Vec::new();
        let mut numbers: BTreeMap<u32, Vec<PathBuf>> = BTreeMap::new();
        for (source, outcome) in outcomes {
            match outcome {
                Ok((header, body)) => {
                    numbers
                        .entry(header.number)
                        .or_default()
                        .push(source.path.clone());
                    parsed.push(ParsedDocument {
                        source,
                        header,
                        body,
                    });
                }
                Err(HeaderError::InvalidEnumValue {
                    field,
                    value,
                    expected,
                }) => {
                    let number = peek_number(&source.content);
                    if let Some(number) = number {
                        numbers.entry(number).or_default().push(source.path.clone());
                    }
                    let error = DocumentError::InvalidEnumValue {
                        field,
                        value,
                        expected,
                    };
                    tracing::warn!("[Compiler] {}: {}", source.path.display(), error);
                    reports.push(DocumentReport::new(source.path.clone(), number, vec![error]));
                }
                Err(error) => {
                    tracing::error!("[Compiler] {}: {}", source.path.display(), error);
                    fatal.push(CorpusError::MalformedHeader {
                        path: source.path.clone(),
                        error,
                    });
                }
            }
        }
        for (number, mut paths) in numbers {
            if paths.len() > 1 {
                paths.sort();
                tracing::error!(
                    "[Compiler] number {} is declared by {} documents",
                    number,
                    paths.len()
                );
                fatal.push(CorpusError::DuplicateNumber { number, paths });
            }
        }
        if !fatal.is_empty() {
            fatal.sort_by(|a, b| a.path().cmp(&b.path()).then_with(|| a.cmp(b)));
            return Err(SiteError::Corpus(fatal));
        }
        tracing::info!(
            "[Compiler] parsed {} header(s), {} document(s) skipped",
            parsed.len(),
            reports.len()
        );

        let symbols = Arc::new(SymbolTable::build(
            parsed.iter().map(|doc| &doc.header),
            &self.ctx.site_root,
        ));
        tracing::info!(
            "[Compiler] symbol table frozen with {} entries",
            symbols.len()
        );

        let (rendered, (indexes, redirects)) = rayon::join(
            || {
                parsed
                    .par_iter()
                    .map(|doc| self.render_document(doc, &symbols))
                    .collect::<Vec<(DocumentReport, Option<RenderedPage>)>>()
            },
            || {
                rayon::join(
                    || self.render_indexes(parsed.iter().map(|doc| &doc.header)),
                    || {
                        RedirectTable::build(
                            &symbols,
                            &self.config.legacy_shapes,
                            &self.ctx.site_root,
                        )
                    },
                )
            },
        );
        let mut indexes = indexes?;
        let redirects = redirects?;

        let mut files = BTreeMap::new();
        let mut assets = BTreeMap::new();
        let mut published = BTreeSet::new();
        for (report, page) in rendered {
            reports.push(report);
            if let Some(page) = page {
                files.insert(page_file(page.number), page.html);
                assets.extend(page.assets);
                published.insert(page.number);
            }
        }
        reports.sort_by(|a, b| (a.number, &a.path).cmp(&(b.number, &b.path)));
        tracing::info!(
            "[Compiler] rendered {} of {} document page(s)",
            published.len(),
            parsed.len()
        );

        // Listings only name pages that exist. The indexes were built speculatively from every
        // parsed header; rebuild them when a page failed to render.
        let published_headers = parsed
            .iter()
            .map(|doc| &doc.header)
            .filter(|header| published.contains(&header.number))
            .collect::<Vec<&DocumentHeader>>();
        if published_headers.len() != parsed.len() {
            tracing::debug!("[Compiler] rebuilding indexes without unpublished documents");
            indexes = self.render_indexes(published_headers.iter().copied())?;
        }
        files.extend(indexes);

        files.insert(
            PathBuf::from(STYLESHEET),
            stylesheet(&theme_css(&self.config.highlight_theme)?),
        );
        let mut listing = serde_json::to_string_pretty(&api_listing(
            published_headers.iter().copied(),
            &self.ctx,
        ))?;
        listing.push('\n');
        files.insert(PathBuf::from(API_LISTING), listing);
        if let Some(xml) = sitemap(published.iter().copied(), &self.ctx) {
            files.insert(PathBuf::from(SITEMAP), xml);
        }
        files.insert(PathBuf::from(REDIRECTS_JSON), redirects.to_json()?);
        files.insert(PathBuf::from(REDIRECTS_NGINX), redirects.to_nginx()?);

        Ok(CompiledSite {
            files,
            assets,
            symbols,
            summary: BuildSummary {
                reports,
                files_written: 0,
                redirect_rules: redirects.len(),
            },
            redirects,
        })
    }

    fn render_indexes<'h, I>(&self, headers: I) -> Result<BTreeMap<PathBuf, String>, SiteError>
    where
        I: IntoIterator<Item = &'h DocumentHeader>,
    {
        let mut files = BTreeMap::new();
        for page in build_indexes(headers, &self.ctx.site_root) {
            files.insert(PathBuf::from(page.file_name()), page.render(&self.ctx)?);
        }
        Ok(files)
    }

    fn render_document(
        &self,
        doc: &ParsedDocument<'_>,
        symbols: &SymbolTable,
    ) -> (DocumentReport, Option<RenderedPage>) {
        let header = &doc.header;
        let number = header.number;
        tracing::debug!("[Compiler] rendering {:?} as PEP {}", doc.source.path, number);

        let ctx = RenderContext { number, symbols };
        let body = self.codec.render(doc.body, &ctx);
        let mut errors = body.errors;
        errors.extend(
            header
                .consistency_warnings()
                .into_iter()
                .map(DocumentError::InconsistentHeader),
        );

        let slug_dir = PathBuf::from(canonical_slug(number));
        let source_dir = doc.source.source_path.parent().unwrap_or(Path::new(""));
        let mut assets = Vec::new();
        for asset in body.assets {
            let source = source_dir.join(&asset);
            if source.is_file() {
                assets.push((slug_dir.join(&asset), source));
            } else {
                errors.push(DocumentError::MissingAsset {
                    src: asset.display().to_string(),
                    reason: format!("{} does not exist", source.display()),
                });
            }
        }

        let html = header_table(header, symbols, &mut errors).and_then(|table| {
            let mut content = String::new();
            content.push_str("<article class=\"pep\">\n");
            content.push_str(&format!(
                "<h1 class=\"page-title\">PEP {} &ndash; {}</h1>\n",
                number,
                escape_html(&header.title)
            ));
            content.push_str(&table);
            content.push_str(&body.html);
            content.push_str("</article>\n");
            let mut page = String::new();
            write_page(
                &mut page,
                &self.ctx,
                &format!("PEP {} \u{2013} {}", number, header.title),
                Some(&canonical_path(&self.ctx.site_root, number)),
                &content,
                false,
            )?;
            Ok(page)
        });
        let html = match html {
            Ok(html) => Some(html),
            Err(e) => {
                errors.push(DocumentError::Render(e.to_string()));
                None
            }
        };

        let report = DocumentReport::new(doc.source.path.clone(), Some(number), errors);
        for error in report.errors.iter() {
            tracing::warn!("[Compiler] {}: {}", doc.source.path.display(), error);
        }
        let page = match (report.published, html) {
            (true, Some(html)) => Some(RenderedPage {
                number,
                html,
                assets,
            }),
            _ => None,
        };
        (report, page)
    }

    /// Write a compiled site to the output directory. Returns the number of files written.
    pub async fn write(&self, site: &CompiledSite) -> Result<usize, SiteError> {
        let out = &self.config.output_dir;
        if self.config.clean && tokio::fs::try_exists(out).await? {
            tracing::info!("[Compiler] removing previous output in {:?}", out);
            tokio::fs::remove_dir_all(out).await?;
        }
        tokio::fs::create_dir_all(out).await?;

        let mut written = 0;
        for (relative, content) in site.files.iter() {
            let path = out.join(relative);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, content).await?;
            written += 1;
        }
        for (relative, source) in site.assets.iter() {
            let path = out.join(relative);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::copy(source, &path).await?;
            written += 1;
        }
        tracing::info!("[Compiler] wrote {} file(s) to {:?}", written, out);
        Ok(written)
    }

    /// Discover, read, compile and write the whole corpus.
    pub async fn build(&self) -> Result<BuildSummary, SiteError> {
        let paths = self.discover()?;
        let corpus = self.load_sources(paths).await;
        let site = self.compile(corpus)?;
        let written = self.write(&site).await?;
        let mut summary = site.summary;
        summary.files_written = written;
        tracing::info!(
            "[Compiler] build finished: {} published, {} skipped, {} warning(s)",
            summary.published().count(),
            summary.skipped().count(),
            summary.warning_count()
        );
        Ok(summary)
    }
}

/// Absolute form of `path`, with `.` and `..` applied and symlinks resolved for the part of
/// the path that exists.
fn resolve_dir(path: &Path) -> Result<PathBuf, SiteError> {
    let mut lexical = PathBuf::new();
    for component in std::path::absolute(path)?.components() {
        match component {
            Component::ParentDir => {
                lexical.pop();
            }
            Component::CurDir => {}
            other => lexical.push(other),
        }
    }
    let mut existing = lexical.as_path();
    let mut missing = Vec::new();
    loop {
        if let Ok(resolved) = existing.canonicalize() {
            return Ok(missing
                .iter()
                .rev()
                .fold(resolved, |dir, name| dir.join(name)));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                existing = parent;
            }
            _ => return Ok(lexical.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        codec::{diagnostic::BuildStatus, RenderedBody},
        tests::helpers::source_text,
    };
    use test_log::test;

    fn compiler() -> SiteCompiler {
        let config = BuildConfig {
            jobs: Some(2),
            ..BuildConfig::new("/corpus", "/out")
        };
        SiteCompiler::new(config).unwrap()
    }

    fn corpus(sources: Vec<(&str, String)>) -> Corpus {
        Corpus::in_memory(Path::new("/corpus"), sources)
    }

    fn sample() -> Vec<(&'static str, String)> {
        vec![
            (
                "pep-0001.md",
                source_text(1, "Purpose", "Active", "See PEP 8 and PEP 12.\n"),
            ),
            (
                "pep-0008.md",
                source_text(8, "Style Guide", "Final", "## Naming\n\nBack to PEP 1.\n"),
            ),
            (
                "pep-0012.md",
                source_text(12, "Template", "Draft", "[style](pep:8#naming)\n"),
            ),
        ]
    }

    #[test]
    fn test_compile_clean_corpus() {
        let site = compiler().compile(corpus(sample())).unwrap();
        assert_eq!(site.summary.status(), BuildStatus::Clean);
        assert_eq!(site.summary.published().count(), 3);
        for file in [
            "pep-0001/index.html",
            "pep-0008/index.html",
            "pep-0012/index.html",
            "index.html",
            "index-by-status.html",
            "index-by-type.html",
            "index-by-author.html",
            "style.css",
            "api/peps.json",
            "redirects.json",
            "redirects.nginx.conf",
        ] {
            assert!(site.files.contains_key(Path::new(file)), "missing {file}");
        }
        assert!(!site.files.contains_key(Path::new(SITEMAP)));
        let page = &site.files[Path::new("pep-0012/index.html")];
        assert!(page.contains("href=\"/pep-0008/#naming\""));
        assert_eq!(site.redirects.len(), 3 * 3 + 2);
    }

    #[test]
    fn test_output_is_independent_of_input_order() {
        let mut shuffled = sample();
        shuffled.reverse();
        shuffled.swap(0, 1);
        let a = compiler().compile(corpus(sample())).unwrap();
        let b = compiler().compile(corpus(shuffled)).unwrap();
        assert_eq!(a.files, b.files);
        assert_eq!(a.summary, b.summary);
    }

    #[test]
    fn test_duplicate_number_is_fatal() {
        let mut sources = sample();
        sources.push((
            "dup/pep-0042.md",
            source_text(42, "Answer", "Draft", "One.\n"),
        ));
        sources.push(("pep-0042.md", source_text(42, "Other", "Draft", "Two.\n")));
        let err = compiler().compile(corpus(sources)).unwrap_err();
        assert_eq!(
            err.corpus_errors(),
            &[CorpusError::DuplicateNumber {
                number: 42,
                paths: vec![
                    PathBuf::from("dup/pep-0042.md"),
                    PathBuf::from("pep-0042.md")
                ],
            }]
        );
    }

    #[test]
    fn test_invalid_enum_still_counts_for_duplicates() {
        let mut sources = sample();
        sources.push(("a.md", source_text(8, "Again", "Pending", "x\n")));
        let err = compiler().compile(corpus(sources)).unwrap_err();
        assert!(matches!(
            err.corpus_errors(),
            [CorpusError::DuplicateNumber { number: 8, .. }]
        ));
    }

    #[test]
    fn test_fatal_errors_are_gathered() {
        let mut c = corpus(vec![
            ("b.md", "Title: no number\n\nbody\n".to_string()),
            ("a.md", source_text(5, "Fine", "Draft", "x\n")),
        ]);
        c.errors.push(CorpusError::Unreadable {
            path: PathBuf::from("c.md"),
            reason: "stream did not contain valid UTF-8".to_string(),
        });
        let err = compiler().compile(c).unwrap_err();
        let errors = err.corpus_errors();
        assert_eq!(errors.len(), 2);
        assert!(matches!(&errors[0], CorpusError::MalformedHeader { path, .. } if path == Path::new("b.md")));
        assert!(matches!(&errors[1], CorpusError::Unreadable { .. }));
    }

    #[test]
    fn test_invalid_status_skips_only_that_document() {
        let mut sources = sample();
        sources.push(("pep-0099.md", source_text(99, "Odd", "Pending", "x\n")));
        let site = compiler().compile(corpus(sources)).unwrap();
        assert_eq!(site.summary.status(), BuildStatus::Warnings);
        let skipped = site.summary.skipped().collect::<Vec<_>>();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].number, Some(99));
        assert!(!site.files.contains_key(&page_file(99)));
        assert!(site.files.contains_key(&page_file(8)));
    }

    #[test]
    fn test_unresolved_reference_publishes_with_one_warning() {
        let mut sources = sample();
        sources.push((
            "pep-0020.md",
            source_text(20, "Zen", "Active", "Unlike PEP 9999 (see PEP 9999).\n"),
        ));
        let site = compiler().compile(corpus(sources)).unwrap();
        assert_eq!(site.summary.status(), BuildStatus::Warnings);
        assert_eq!(
            site.summary.errors_for(20),
            vec![&DocumentError::UnresolvedReference { number: 9999 }]
        );
        let page = &site.files[&page_file(20)];
        assert!(page.contains("Unlike PEP 9999 (see PEP 9999)."));
    }

    #[test]
    fn test_inconsistent_header_publishes_with_warning() {
        let mut sources = sample();
        sources.push((
            "pep-0030.md",
            "PEP: 30\nTitle: Feature\nAuthor: A. Author\nStatus: Active\n\
             Type: Standards Track\nCreated: 01-Jan-2020\n\nBody.\n"
                .to_string(),
        ));
        sources.push((
            "pep-0031.md",
            "PEP: 31\nTitle: Abandoned\nAuthor: A. Author\nStatus: Withdrawn\n\
             Type: Informational\nCreated: 01-Jan-2020\nSuperseded-By: 8\n\nBody.\n"
                .to_string(),
        ));
        let site = compiler().compile(corpus(sources)).unwrap();
        assert_eq!(site.summary.status(), BuildStatus::Warnings);
        assert_eq!(site.summary.skipped().count(), 0);
        for number in [30, 31] {
            assert!(
                matches!(
                    site.summary.errors_for(number).as_slice(),
                    [DocumentError::InconsistentHeader(_)]
                ),
                "{number}"
            );
            assert!(site.files.contains_key(&page_file(number)));
        }
        assert!(site.summary.errors_for(1).is_empty());
        assert!(site.summary.errors_for(8).is_empty());
    }

    /// Fails to render one document, renders everything else as escaped text.
    struct FailingCodec(u32);

    impl BodyCodec for FailingCodec {
        fn render(&self, body: &str, ctx: &RenderContext<'_>) -> RenderedBody {
            let mut out = RenderedBody {
                html: format!("<pre>{}</pre>", escape_html(body)),
                ..RenderedBody::default()
            };
            if ctx.number == self.0 {
                out.errors.push(DocumentError::Render("template blew up".to_string()));
            }
            out
        }
    }

    #[test]
    fn test_render_failure_is_left_out_of_listings() {
        let config = BuildConfig {
            jobs: Some(2),
            ..BuildConfig::new("/corpus", "/out")
        };
        let compiler = SiteCompiler::with_codec(config, Arc::new(FailingCodec(12))).unwrap();
        let site = compiler.compile(corpus(sample())).unwrap();

        assert_eq!(site.summary.skipped().count(), 1);
        assert!(!site.files.contains_key(&page_file(12)));
        for index in ["index.html", "index-by-status.html", "index-by-type.html"] {
            let page = &site.files[&PathBuf::from(index)];
            assert!(page.contains("href=\"/pep-0008/\""), "{index}");
            assert!(!page.contains("href=\"/pep-0012/\""), "{index}");
        }
        let listing: serde_json::Value =
            serde_json::from_str(&site.files[&PathBuf::from(API_LISTING)]).unwrap();
        assert!(listing.get("8").is_some());
        assert!(listing.get("12").is_none());
    }

    #[test]
    fn test_missing_image_is_a_warning() {
        let sources = vec![(
            "pep-0003.md",
            source_text(3, "Pictures", "Draft", "![flow](flow.png)\n"),
        )];
        let site = compiler().compile(corpus(sources)).unwrap();
        assert!(site.summary.reports[0].published);
        assert!(matches!(
            site.summary.reports[0].errors.as_slice(),
            [DocumentError::MissingAsset { src, .. }] if src == "flow.png"
        ));
        assert!(site.assets.is_empty());
    }

    #[test]
    fn test_clean_refuses_to_remove_sources() {
        let config = BuildConfig {
            clean: true,
            ..BuildConfig::new("/site/peps", "/site")
        };
        assert!(matches!(
            SiteCompiler::new(config),
            Err(SiteError::Config(_))
        ));
    }

    #[test]
    fn test_clean_refusal_sees_through_path_spelling() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        let source_dir = tmp.path().join("build").join("peps");
        std::fs::create_dir_all(&source_dir)?;
        std::fs::create_dir_all(tmp.path().join("other"))?;

        for output_dir in [
            tmp.path().join("other").join("..").join("build"),
            tmp.path().join(".").join("build"),
            tmp.path().join("build").join("peps").join(".."),
        ] {
            let config = BuildConfig {
                clean: true,
                ..BuildConfig::new(&source_dir, &output_dir)
            };
            assert!(
                matches!(SiteCompiler::new(config), Err(SiteError::Config(_))),
                "{output_dir:?}"
            );
        }

        let config = BuildConfig {
            clean: true,
            ..BuildConfig::new(&source_dir, tmp.path().join("site"))
        };
        assert!(SiteCompiler::new(config).is_ok());
        Ok(())
    }

    #[test(tokio::test)]
    async fn test_write_and_clean() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        let source_dir = tmp.path().join("peps");
        let output_dir = tmp.path().join("out");
        std::fs::create_dir_all(&source_dir)?;
        std::fs::create_dir_all(&output_dir)?;
        std::fs::write(output_dir.join("stale.html"), "old")?;
        std::fs::write(
            source_dir.join("pep-0001.md"),
            source_text(1, "One", "Draft", "![logo](logo.svg)\n"),
        )?;
        std::fs::write(source_dir.join("logo.svg"), "<svg/>")?;
        std::fs::write(source_dir.join("notes.rst"), "ignored")?;

        let config = BuildConfig {
            clean: true,
            ..BuildConfig::new(&source_dir, &output_dir)
        };
        let summary = SiteCompiler::new(config)?.build().await?;
        assert_eq!(summary.status(), BuildStatus::Clean);
        assert_eq!(summary.reports.len(), 1);
        assert!(output_dir.join("pep-0001/index.html").is_file());
        assert!(output_dir.join("pep-0001/logo.svg").is_file());
        assert!(!output_dir.join("stale.html").exists());
        // page, four indexes, stylesheet, listing, two redirect manifests, image
        assert_eq!(summary.files_written, 10);
        Ok(())
    }
}
