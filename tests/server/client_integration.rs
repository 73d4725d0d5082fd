use lifecycle_stubs::client::{Client, ClientError, Method, MockClient};

use crate::helpers::{connect, random_path, start_server};

#[tokio::test]
async fn should_respond_with_404_when_no_mocks_specified() {
    let Dsl {
        control: mock_client,
        reqwest_client: client,
    } = setup_server().await;
    let response = client
        .get(format!("{}/non-existent-path", mock_client.url()))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn should_respond_with_200_for_matched_path() {
    let path = random_path();
    let Dsl {
        control: mock_client,
        reqwest_client: client,
    } = setup_server().await;
    mock_client
        .when(|when| when.path(&path))
        .then(|then| then.status(200))
        .send()
        .await
        .expect("Failed to install mock");

    let response = client
        .get(format!("{}{}", mock_client.url(), path))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn should_respond_with_404_for_unmatched_path() {
    let server_path = random_path();
    let client_path = random_path();
    assert_ne!(
        server_path, client_path,
        "Server path should not match client path"
    );
    let Dsl {
        control: mock_client,
        reqwest_client: client,
    } = setup_server().await;
    mock_client
        .when(|when| when.path(&server_path))
        .then(|then| then.status(200))
        .send()
        .await
        .expect("Failed to install mock");

    let response = client
        .get(format!("{}{}", mock_client.url(), client_path))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn should_match_on_method_and_serve_headers_and_body() {
    let path = random_path();
    let Dsl {
        control: mock_client,
        reqwest_client: client,
    } = setup_server().await;
    mock_client
        .when(|when| when.path(&path).method(Method::POST))
        .then(|then| {
            then.status(201)
                .header("x-request-id", "abc")
                .body("created")
        })
        .send()
        .await
        .expect("Failed to install mock");

    let get = client
        .get(format!("{}{}", mock_client.url(), path))
        .send()
        .await
        .expect("Failed to send request");
    let post = client
        .post(format!("{}{}", mock_client.url(), path))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(get.status(), 404);
    assert_eq!(post.status(), 201);
    assert_eq!(post.headers().get("x-request-id").unwrap(), "abc");
    assert_eq!(post.text().await.unwrap(), "created");
}

#[tokio::test]
async fn should_advance_scenario_state_through_gated_rules() {
    let path = random_path();
    let Dsl {
        control: mock_client,
        reqwest_client: client,
    } = setup_server().await;
    mock_client
        .when(|when| {
            when.path(&path)
                .in_scenario("toggle")
                .when_state_is("Started")
                .will_set_state_to("on")
        })
        .then(|then| then.status(200).body("first"))
        .send()
        .await
        .expect("Failed to install mock");
    mock_client
        .when(|when| when.path(&path).in_scenario("toggle").when_state_is("on"))
        .then(|then| then.status(200).body("second"))
        .send()
        .await
        .expect("Failed to install mock");

    assert_eq!(
        mock_client.scenario_state("toggle").await,
        Ok(Some("Started".to_string()))
    );
    let url = format!("{}{}", mock_client.url(), path);
    let first = client.get(&url).send().await.unwrap().text().await.unwrap();
    let second = client.get(&url).send().await.unwrap().text().await.unwrap();
    let third = client.get(&url).send().await.unwrap().text().await.unwrap();

    assert_eq!(first, "first");
    assert_eq!(second, "second");
    assert_eq!(third, "second");
    assert_eq!(
        mock_client.scenario_state("toggle").await,
        Ok(Some("on".to_string()))
    );
}

#[tokio::test]
async fn should_report_unknown_scenario_as_absent() {
    let Dsl {
        control: mock_client,
        ..
    } = setup_server().await;

    assert_eq!(mock_client.scenario_state("never-seen").await, Ok(None));
    assert_eq!(mock_client.reset_scenario("never-seen").await, Ok(0));
}

#[tokio::test]
async fn should_keep_clients_sharing_a_server_apart() {
    let path = random_path();
    let server_ports = start_server().await;
    let first = connect(&server_ports).await;
    let second = connect(&server_ports).await;
    first
        .when(|when| when.path(&path))
        .then(|then| then.status(201))
        .send()
        .await
        .expect("Failed to install mock");
    second
        .when(|when| when.path(&path))
        .then(|then| then.status(202))
        .send()
        .await
        .expect("Failed to install mock");

    let first_response = reqwest::get(format!("{}{}", first.url(), path))
        .await
        .expect("Failed to send request");
    let second_response = reqwest::get(format!("{}{}", second.url(), path))
        .await
        .expect("Failed to send request");

    assert_ne!(first.instance(), second.instance());
    assert_eq!(first_response.status(), 201);
    assert_eq!(second_response.status(), 202);
    assert_eq!(first.reset_all_scenarios().await, Ok(0));
    assert_eq!(second.scenario_state("toggle").await, Ok(None));
}

#[tokio::test]
async fn should_fail_to_connect_without_server() {
    let result = Client::new("http://127.0.0.1:1").await;

    assert_eq!(result.err(), Some(ClientError::FailedToConnectToMockServer));
}

struct Dsl {
    control: Client,
    reqwest_client: reqwest::Client,
}

async fn setup_server() -> Dsl {
    let server_ports = start_server().await;
    let mock_client = connect(&server_ports).await;
    let client = reqwest::Client::new();
    Dsl {
        control: mock_client,
        reqwest_client: client,
    }
}
