use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use imagecrawl::{
    normalize_url, Config, ContentFetcher, CrawlError, Crawler, DomainScope, FetchedPage,
    HtmlImageProcessor, HtmlLinkExtractor, LinkExtractor, PageProcessor, VisitedSet,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use url::Url;

// Fast settings for all benchmarks
fn configure_fast_group(group: &mut criterion::BenchmarkGroup<criterion::measurement::WallTime>) {
    group.warm_up_time(Duration::from_millis(500));
    group.measurement_time(Duration::from_millis(500));
    group.sample_size(20);
}

fn sample_page(links: usize) -> FetchedPage {
    let mut body = String::from("<html><head><link rel=\"icon\" href=\"/favicon.ico\"></head><body>");
    for i in 0..links {
        body.push_str(&format!(
            "<a href=\"/section/{i}\">Section {i}</a><img src=\"/img/{i}.jpg\" srcset=\"/img/{i}@2x.jpg 2x\">"
        ));
    }
    body.push_str("</body></html>");

    let url = Url::parse("https://example.com/").unwrap();
    FetchedPage {
        url: url.clone(),
        final_url: url,
        status: 200,
        content_type: Some("text/html".to_string()),
        body,
    }
}

/// Every page links to `fanout` children until `levels` is exhausted.
struct SyntheticSite {
    fanout: usize,
    levels: usize,
}

impl SyntheticSite {
    fn level(url: &Url) -> usize {
        url.path_segments().map(|s| s.filter(|p| !p.is_empty()).count()).unwrap_or(0)
    }
}

#[async_trait]
impl ContentFetcher for SyntheticSite {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, CrawlError> {
        Ok(FetchedPage {
            url: url.clone(),
            final_url: url.clone(),
            status: 200,
            content_type: Some("text/html".to_string()),
            body: String::new(),
        })
    }
}

impl LinkExtractor for SyntheticSite {
    fn extract_links(&self, page: &FetchedPage) -> Vec<String> {
        if Self::level(&page.url) >= self.levels {
            return Vec::new();
        }
        let base = page.url.as_str().trim_end_matches('/');
        (0..self.fanout).map(|i| format!("{base}/{i}")).collect()
    }
}

#[async_trait]
impl PageProcessor for SyntheticSite {
    async fn extract_artifacts(&self, page: &FetchedPage) -> Result<Vec<String>, CrawlError> {
        Ok(vec![format!("{}/image.png", page.url.as_str().trim_end_matches('/'))])
    }
}

// === UNIT BENCHMARKS ===

fn benchmark_normalize_url(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize_url");
    configure_fast_group(&mut group);

    group.bench_function("trailing_slash", |b| {
        b.iter(|| black_box(normalize_url(black_box("  https://example.com/docs/guide/  "))));
    });

    group.finish();
}

fn benchmark_domain_scope(c: &mut Criterion) {
    let mut group = c.benchmark_group("domain_scope");
    configure_fast_group(&mut group);

    let scope = DomainScope::new("example.com");
    let candidates = [
        "https://example.com/about",
        "https://cdn.images.example.com/a.png",
        "https://notexample.com/",
        "https://other.test/x",
    ];

    group.bench_function("in_scope", |b| {
        b.iter(|| {
            for candidate in &candidates {
                black_box(scope.in_scope(black_box(candidate)));
            }
        });
    });

    group.finish();
}

fn benchmark_visited_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("visited_set");
    configure_fast_group(&mut group);

    let urls: Vec<String> = (0..1000).map(|i| format!("https://example.com/page/{i}")).collect();

    group.bench_function("try_visit_1000", |b| {
        b.iter(|| {
            let visited = VisitedSet::new();
            for url in &urls {
                black_box(visited.try_visit(url));
            }
            for url in &urls {
                black_box(visited.try_visit(url));
            }
        });
    });

    group.finish();
}

fn benchmark_html_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("html_extraction");
    configure_fast_group(&mut group);

    let links = HtmlLinkExtractor::new();
    let images = HtmlImageProcessor::new();

    for size in [10, 100] {
        let page = sample_page(size);
        group.bench_with_input(BenchmarkId::new("links", size), &page, |b, page| {
            b.iter(|| black_box(links.extract_links(page)));
        });
        group.bench_with_input(BenchmarkId::new("images", size), &page, |b, page| {
            b.iter(|| black_box(images.collect(page)));
        });
    }

    group.finish();
}

// === CRAWL BENCHMARKS ===

fn benchmark_in_memory_crawl(c: &mut Criterion) {
    let mut group = c.benchmark_group("crawl");
    configure_fast_group(&mut group);

    let rt = Runtime::new().unwrap();

    for workers in [1, 8] {
        let site = Arc::new(SyntheticSite { fanout: 6, levels: 3 });
        let config = Config {
            worker_count: workers,
            ..Default::default()
        };
        let crawler = Crawler::with_components(config, site.clone(), site.clone(), site).unwrap();

        group.bench_with_input(BenchmarkId::new("workers", workers), &crawler, |b, crawler| {
            b.iter(|| rt.block_on(async { black_box(crawler.crawl("https://example.com/", 3).await) }));
        });
    }

    group.finish();
}

criterion_group!(
    unit_benches,
    benchmark_normalize_url,
    benchmark_domain_scope,
    benchmark_visited_set,
    benchmark_html_extraction
);

criterion_group!(crawl_benches, benchmark_in_memory_crawl);

criterion_main!(unit_benches, crawl_benches);
