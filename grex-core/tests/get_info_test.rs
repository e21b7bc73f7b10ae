use grex_core::source::ClientConnectError;
use grex_core::{GetInfoError, get_info};

#[tokio::test]
async fn get_info_rejects_invalid_urls() {
    let result = get_info("not a valid url").await;

    assert!(matches!(
        result,
        Err(GetInfoError::Connect(ClientConnectError::InvalidUrl(url, _))) if url == "not a valid url"
    ));
}
