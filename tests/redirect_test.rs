use regex::Regex;
use std::fs;
use test_log::test;

use pepsite::{
    compiler::{Corpus, SiteCompiler, REDIRECTS_JSON},
    config::BuildConfig,
    paths::canonical_path,
    redirect::{default_shapes, LegacyShape, RedirectRule},
};

mod common;
use common::fixture_corpus;

const FIXTURE_NUMBERS: [u32; 7] = [1, 8, 12, 20, 101, 102, 484];

/// Evaluate the manifest the way a first-match-wins serving layer would.
fn serve(rules: &[(RedirectRule, Regex)], url: &str) -> Option<String> {
    let (path, fragment) = match url.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (url, None),
    };
    let (rule, _) = rules.iter().find(|(_, re)| re.is_match(path))?;
    Some(match (rule.fragment_preserving, fragment) {
        (true, Some(fragment)) => format!("{}#{}", rule.target, fragment),
        _ => rule.target.clone(),
    })
}

#[test(tokio::test)]
async fn test_manifest_covers_every_legacy_shape() -> Result<(), Box<dyn std::error::Error>> {
    let (tmp, corpus) = fixture_corpus("corpus_1")?;
    let out = tmp.path().join("site");
    SiteCompiler::new(BuildConfig::new(&corpus, &out))?
        .build()
        .await?;

    let rules: Vec<RedirectRule> =
        serde_json::from_str(&fs::read_to_string(out.join(REDIRECTS_JSON))?)?;
    assert_eq!(rules.len(), FIXTURE_NUMBERS.len() * 3 + 2);
    let compiled = rules
        .into_iter()
        .map(|rule| Regex::new(&rule.pattern).map(|re| (rule, re)))
        .collect::<Result<Vec<_>, _>>()?;

    for shape in default_shapes() {
        for number in FIXTURE_NUMBERS {
            let url = shape.legacy_url(number, 2009);
            let matching = compiled
                .iter()
                .filter(|(_, re)| re.is_match(&url))
                .collect::<Vec<_>>();
            assert_eq!(matching.len(), 1, "{url}");
            assert_eq!(matching[0].0.target, canonical_path("/", number));

            let with_fragment = format!("{url}#rationale");
            assert_eq!(
                serve(&compiled, &with_fragment),
                Some(format!("{}#rationale", canonical_path("/", number)))
            );
        }
    }
    assert_eq!(serve(&compiled, "/dev/peps/").as_deref(), Some("/"));
    assert_eq!(serve(&compiled, "/dev/peps/pep-0999/"), None);

    let nginx = fs::read_to_string(out.join("redirects.nginx.conf"))?;
    assert_eq!(
        nginx.lines().filter(|l| l.starts_with("location ~ ")).count(),
        compiled.len()
    );
    Ok(())
}

#[test]
fn test_custom_shapes_and_site_root() -> Result<(), Box<dyn std::error::Error>> {
    let config = BuildConfig {
        site_root: "/peps/".to_string(),
        legacy_shapes: vec![
            LegacyShape::NumericHtml {
                prefix: "/archive".to_string(),
            },
            LegacyShape::NumericHtml {
                prefix: "/archive".to_string(),
            },
        ],
        ..BuildConfig::new("/corpus", "/out")
    };
    let compiler = SiteCompiler::new(config)?;
    let corpus = Corpus::in_memory(
        std::path::Path::new("/corpus"),
        [(
            "pep-0008.md",
            common::document(8, "Style", "Active", "Body.\n"),
        )],
    );
    let site = compiler.compile(corpus)?;
    assert_eq!(site.redirects.len(), 2);
    assert_eq!(
        site.redirects.resolve("/archive/pep-0008.html#x").as_deref(),
        Some("/peps/pep-0008/#x")
    );
    assert_eq!(site.redirects.resolve("/archive").as_deref(), Some("/peps/"));
    Ok(())
}
