use chrono::{TimeZone, Utc};
use mockito::Matcher;
use tokio::net::TcpListener;

use sentinel::config::Config;
use sentinel::connectors::{IbkrReferenceSource, KrakenPriceSource, NewsApiSource};
use sentinel::pipeline::Pipeline;
use sentinel::report::render_report;

async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test]
async fn test_report_survives_unreachable_gateway() {
    let port = closed_port().await;
    let config = Config::from_ini_str(&format!(
        "[IBKR]\nHOST = 127.0.0.1\nPORT = {}\nCLIENT_ID = 3\n\n[NEWS_API]\nAPI_KEY = it-key\n",
        port
    ))
    .unwrap();

    let mut news_server = mockito::Server::new_async().await;
    let news_mock = news_server
        .mock("GET", "/v2/everything")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "Unknown".into()),
            Matcher::UrlEncoded("apiKey".into(), "it-key".into()),
        ]))
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"status":"ok","articles":[
                {"title":"Markets rally on strong earnings"},
                {"title":"Recession fears grow"}
            ]}"#,
        )
        .create_async()
        .await;

    let mut kraken_server = mockito::Server::new_async().await;
    let kraken_mock = kraken_server
        .mock("GET", "/0/public/Ticker")
        .match_query(Matcher::UrlEncoded("pair".into(), "XXBTZUSD".into()))
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":[],"result":{"XXBTZUSD":{"c":["101234.5","0.01"]}}}"#)
        .create_async()
        .await;

    let pipeline = Pipeline::new(
        Box::new(IbkrReferenceSource::new(&config.ibkr)),
        Box::new(NewsApiSource::with_base_url(
            config.news_api.api_key.clone(),
            news_server.url(),
        )),
        Box::new(KrakenPriceSource::with_base_url(kraken_server.url())),
    );

    let run = pipeline.run().await;

    news_mock.assert_async().await;
    kraken_mock.assert_async().await;

    assert_eq!(run.degraded.len(), 1);
    assert_eq!(run.degraded[0].source, "IBKR");
    assert_eq!(run.sentiment.details.len(), 2);
    assert!(run.report.average_compound > -1.0 && run.report.average_compound < 1.0);

    let generated_at = Utc.with_ymd_and_hms(2026, 10, 17, 9, 30, 0).unwrap();
    let report = render_report(&run.report, generated_at);
    assert!(report.contains("Date and Time: 2026-10-17 09:30:00 UTC"));
    assert!(report.contains(": Unknown (via IBKR)"));
    assert!(report.contains(": $101,234.50\n"));
}

#[tokio::test]
async fn test_report_with_every_provider_down() {
    let port = closed_port().await;
    let config = Config::from_ini_str(&format!(
        "[IBKR]\nHOST = 127.0.0.1\nPORT = {}\nCLIENT_ID = 3\n\n[NEWS_API]\nAPI_KEY = k\n",
        port
    ))
    .unwrap();

    let pipeline = Pipeline::new(
        Box::new(IbkrReferenceSource::new(&config.ibkr)),
        Box::new(NewsApiSource::with_base_url("k", format!("http://127.0.0.1:{}", port))),
        Box::new(KrakenPriceSource::with_base_url(format!("http://127.0.0.1:{}", port))),
    );

    let run = pipeline.run().await;
    let report = render_report(&run.report, Utc::now());

    assert_eq!(run.degraded.len(), 3);
    assert!(report.contains(": Unknown (via IBKR)"));
    assert!(report.contains(": NEUTRAL (via NewsAPI & AI)"));
    assert!(report.contains(": 0.000\n"));
    assert!(report.contains(": $0.00\n"));
}
