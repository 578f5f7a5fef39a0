// tests/batch_pipeline.rs
//
// Batch harness against scripted pages: no network, no real delays.
//
// Covered:
// - graded / fetch-failed rows and the summary
// - CSV written to disk through the same path the binary uses
// - retry on a transient status

use std::sync::Arc;
use std::time::Duration;

use privacy_grader::batch::{BatchRunner, NoDelay, RetryPolicy, ServiceEntry};
use privacy_grader::fetch::{FetchError, FixtureFetcher};
use privacy_grader::report::{self, Outcome, REPORT_HEADER};
use privacy_grader::{Grade, PolicyScorer};

const GOOD_PAGE: &str = r#"<html><body>
<header>Menu Login</header>
<h1>Privacy</h1>
<p>All mail uses end-to-end encryption. Our code is open source.</p>
<p>We do not sell your personal data.</p>
<footer>&copy; 2024</footer>
</body></html>"#;

const BAD_PAGE: &str = r#"<html><body>
<p>We may share your personal data with advertising partners for behavioral advertising.</p>
</body></html>"#;

fn service(name: &str, expected: Option<Grade>, url: &str) -> ServiceEntry {
    ServiceEntry {
        name: name.to_string(),
        expected,
        url: url.to_string(),
    }
}

fn runner(fetcher: FixtureFetcher) -> BatchRunner {
    BatchRunner::new(Arc::new(PolicyScorer::builtin().unwrap()), Arc::new(fetcher))
        .with_throttle(Arc::new(NoDelay))
        .with_retry(RetryPolicy {
            max_attempts: 2,
            backoff: Duration::ZERO,
        })
}

#[tokio::test]
async fn mixed_batch_produces_rows_and_summary() {
    let fetcher = FixtureFetcher::new()
        .with_page("https://good.test/privacy", GOOD_PAGE)
        .with_page("https://bad.test/privacy", BAD_PAGE)
        .with_failure("https://gone.test/privacy", FetchError::Status(404));

    let services = vec![
        service("Good", Some(Grade::A), "https://good.test/privacy"),
        service("Bad", Some(Grade::D), "https://bad.test/privacy"),
        service("Gone", Some(Grade::B), "https://gone.test/privacy"),
    ];
    let report = runner(fetcher).run(&services).await;

    assert_eq!(report.rows.len(), 3);
    assert!(report.finished_at >= report.started_at);

    let good = &report.rows[0];
    assert_eq!(good.actual(), "A");
    assert!(good.is_match());
    assert_eq!(good.result().unwrap().score, 93);

    let bad = &report.rows[1];
    assert_eq!(bad.actual(), "E");
    assert!(!bad.is_match());

    let gone = &report.rows[2];
    assert!(matches!(gone.outcome, Outcome::FetchFailed(_)));
    assert_eq!(gone.actual(), "ERROR");
    assert_eq!(gone.error(), "HTTP 404");

    let s = &report.summary;
    assert_eq!((s.total, s.graded, s.matched), (3, 2, 1));
    assert_eq!(s.fetch_failures, 1);
    assert_eq!(s.timeouts, 0);
    assert_eq!(s.match_rate(), Some(0.5));
}

#[tokio::test]
async fn report_file_is_written_with_header() {
    let fetcher = FixtureFetcher::new().with_page("https://good.test/privacy", GOOD_PAGE);
    let services = vec![service("Good", Some(Grade::A), "https://good.test/privacy")];
    let report = runner(fetcher).run(&services).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.csv");
    let file = std::fs::File::create(&path).unwrap();
    report::write_csv(&report.rows, file).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    let mut lines = written.lines();
    assert_eq!(lines.next(), Some(REPORT_HEADER));
    let row = lines.next().expect("one data row");
    assert!(row.starts_with(r#""Good","A","A",93,"YES","#), "row: {row}");
    assert!(row.contains("End-to-end encryption; Does not sell data; Open source"));
    assert_eq!(lines.next(), None);
}

#[tokio::test]
async fn transient_failure_is_retried() {
    let fetcher = FixtureFetcher::new()
        .with_failure("https://flaky.test/privacy", FetchError::Status(503))
        .with_page("https://flaky.test/privacy", GOOD_PAGE);
    let services = vec![service("Flaky", Some(Grade::A), "https://flaky.test/privacy")];
    let report = runner(fetcher).run(&services).await;

    assert_eq!(report.summary.graded, 1);
    assert_eq!(report.rows[0].actual(), "A");
}
