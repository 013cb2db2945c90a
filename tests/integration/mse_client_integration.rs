//! MseClient against a local mock of the exchange site

use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{logging, test_data};
use mse_stocks::api::{HistoryProvider, MseClient, SymbolSource};
use mse_stocks::error::CollectorError;

const HISTORY_PATH: &str = "/en/stats/symbolhistory/";

fn client_for(server: &MockServer) -> MseClient {
    MseClient::with_base_url(&format!("{}{}", server.uri(), HISTORY_PATH)).unwrap()
}

#[tokio::test]
async fn test_fetch_history_table_sends_calendar_year_query() {
    logging::init_test_logging();
    logging::log_test_step("History page request and table parsing");

    let server = MockServer::start().await;
    let table = test_data::history_table(&[("12/29/2023", "21,500.00"), ("12/28/2023", "21,450.00")]);

    Mock::given(method("GET"))
        .and(path("/en/stats/symbolhistory/ALK"))
        .and(query_param("fromDate", "2023-01-01"))
        .and(query_param("toDate", "2023-12-31"))
        .respond_with(ResponseTemplate::new(200).set_body_string(test_data::history_page(&table)))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let rows = client
        .fetch_history_table("ALK", test_data::date(2023, 1, 1), test_data::date(2023, 12, 31))
        .await
        .expect("history page should parse");

    assert_eq!(rows, table);
}

#[tokio::test]
async fn test_page_without_table_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/en/stats/symbolhistory/MPT"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body><p>No data</p></body></html>"))
        .mount(&server)
        .await;

    let rows = client_for(&server)
        .fetch_history_table("MPT", test_data::date(2019, 1, 1), test_data::date(2019, 12, 31))
        .await
        .unwrap();

    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_server_error_is_reported_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .fetch_history_table("ALK", test_data::date(2023, 1, 1), test_data::date(2023, 12, 31))
        .await
        .unwrap_err();

    match err.downcast_ref::<CollectorError>() {
        Some(CollectorError::HttpStatus { status, .. }) => assert_eq!(*status, 503),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_list_symbols_reads_code_dropdown() {
    logging::init_test_logging();
    logging::log_test_step("Symbol discovery from the dropdown");

    let server = MockServer::start().await;
    let page = r#"
        <html><body>
        <select id="Language"><option value="en">English</option></select>
        <select id="Code" name="Code">
            <option value="ALK">ALK</option>
            <option value=" kmb ">KMB</option>
            <option value="RMDEN21">RMDEN21</option>
            <option value="TTK">TTK</option>
            <option value="ALK">ALK</option>
            <option value="">--</option>
        </select>
        </body></html>
    "#;

    Mock::given(method("GET"))
        .and(path(HISTORY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(page))
        .mount(&server)
        .await;

    let symbols = client_for(&server).list_symbols().await.unwrap();

    assert_eq!(symbols, vec!["ALK", "KMB", "TTK"]);
}

#[tokio::test]
async fn test_list_symbols_without_dropdown_is_discovery_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    let err = client_for(&server).list_symbols().await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<CollectorError>(),
        Some(CollectorError::Discovery(_))
    ));
}
