//! NOMIS client tests against a mock server.

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gavel_sync::nomis::client::{NomisApi, NomisClient, NomisClientConfig};
use gavel_sync::nomis::types::{NomisHoCode, NomisOffence, NomisStatute};
use gavel_sync::SyncError;

fn client(server: &MockServer) -> NomisClient {
    NomisClient::new(NomisClientConfig::new(server.uri())).unwrap()
}

fn offence_json(code: &str) -> serde_json::Value {
    json!({
        "code": code,
        "description": "An offence",
        "statuteCode": { "code": &code[..4], "description": &code[..4] },
        "severityRanking": "99",
        "activeFlag": "Y"
    })
}

#[tokio::test]
async fn test_paged_fetch_assembles_all_pages_in_order() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/offences/code/A"))
        .and(query_param("page", "0"))
        .and(query_param("sort", "code,ASC"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [offence_json("AF06001"), offence_json("AF06002")],
            "totalPages": 2,
            "totalElements": 3,
            "number": 0,
            "last": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/offences/code/A"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [offence_json("AF06003")],
            "totalPages": 2,
            "totalElements": 3,
            "number": 1,
            "last": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);

    let first = client.get_offences_by_prefix("A", 0, 2).await.unwrap();
    assert_eq!(first.content.len(), 2);
    assert!(!first.last);

    let second = client.get_offences_by_prefix("A", 1, 2).await.unwrap();
    assert_eq!(second.content.len(), 1);
    assert!(second.last);
    assert_eq!(second.content[0].code, "AF06003");
}

#[tokio::test]
async fn test_create_offences_posts_nomis_casing() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/offences/offence"))
        .and(body_partial_json(json!([{
            "code": "AF06999",
            "description": "Causing harm",
            "statuteCode": { "code": "AF06", "description": "AF06" },
            "hoCode": { "code": "195/99" },
            "severityRanking": "195",
            "activeFlag": "Y"
        }])))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let offence = NomisOffence {
        code: "AF06999".to_string(),
        description: "Causing harm".to_string(),
        cjs_title: None,
        statute: NomisStatute {
            code: "AF06".to_string(),
            description: "AF06".to_string(),
        },
        ho_code: Some(NomisHoCode {
            code: "195/99".to_string(),
            description: None,
        }),
        severity_ranking: "195".to_string(),
        active_flag: "Y".to_string(),
        expiry_date: None,
    };

    client(&server).create_offences(&[offence]).await.unwrap();
}

#[tokio::test]
async fn test_non_2xx_is_an_external_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/offences/statute"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let statute = NomisStatute {
        code: "AF06".to_string(),
        description: "Armed Forces Act 2006".to_string(),
    };
    let error = client(&server).create_statutes(&[statute]).await.unwrap_err();

    assert!(matches!(error, SyncError::ExternalApi { system: "NOMIS", .. }));
}
