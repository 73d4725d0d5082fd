use lifecycle_stubs::{
    client::{Client, MockClient},
    compiler::ResourceDescriptor,
    fixtures::generate_name,
    lifecycle::Step,
};
use serde_json::json;

use crate::helpers::{connect, random_path, start_server, test_params, Sdk};

fn shared_resource() -> ResourceDescriptor {
    ResourceDescriptor::new(
        "shared",
        random_path(),
        json!({ "spec": { "owner": "nobody" } }),
    )
    .with_update(json!({ "spec": { "owner": "somebody" } }))
}

#[tokio::test]
async fn should_isolate_scenarios_sharing_a_path() {
    let client = setup().await;
    let resource = shared_resource();
    let first_params = test_params();
    let second_params = test_params();
    let mut first = client.scenario(generate_name("first"), &first_params);
    let mut second = client.scenario(generate_name("second"), &second_params);
    let mut configurator = first.start_configuration();
    configurator
        .register_lifecycle(&resource, &Step::FULL)
        .unwrap();
    first.finish_configuration(configurator).await.unwrap();
    let mut configurator = second.start_configuration();
    configurator
        .register_lifecycle(&resource, &[Step::Create, Step::GetActive])
        .unwrap();
    second.finish_configuration(configurator).await.unwrap();
    let first_sdk = Sdk::new(first.url(), &first_params);
    let second_sdk = Sdk::new(second.url(), &second_params);

    let first_created = first_sdk.put(&resource.path, &json!({})).await;
    let second_created = second_sdk.put(&resource.path, &json!({})).await;
    let second_active = second_sdk.get(&resource.path).await;
    let first_creating = first_sdk.get(&resource.path).await;
    let first_active = first_sdk.get(&resource.path).await;

    assert_eq!(first_created.status, 201);
    assert_eq!(second_created.status, 201);
    assert_eq!(second_active.state(), Some("active"));
    assert_eq!(first_creating.state(), Some("creating"));
    assert_eq!(first_active.state(), Some("active"));

    first.reset().await.unwrap();
    second.reset().await.unwrap();
}

#[tokio::test]
async fn should_isolate_scenarios_sharing_params_by_name() {
    let client = setup().await;
    let resource = shared_resource();
    let params = test_params();
    let mut first = client.scenario(generate_name("first"), &params);
    let mut second = client.scenario(generate_name("second"), &params);
    let mut configurator = first.start_configuration();
    configurator
        .register_lifecycle(&resource, &[Step::Create, Step::GetCreating, Step::GetActive])
        .unwrap();
    let first_handle = first.finish_configuration(configurator).await.unwrap();
    let mut configurator = second.start_configuration();
    configurator
        .register_lifecycle(&resource, &[Step::Create, Step::GetActive])
        .unwrap();
    let second_handle = second.finish_configuration(configurator).await.unwrap();
    let first_sdk = Sdk::new(first_handle.url(), &params);
    let second_sdk = Sdk::new(second_handle.url(), &params);

    let second_created = second_sdk.put(&resource.path, &json!({})).await;
    let first_created = first_sdk.put(&resource.path, &json!({})).await;
    let first_creating = first_sdk.get(&resource.path).await;
    let second_active = second_sdk.get(&resource.path).await;
    let first_active = first_sdk.get(&resource.path).await;

    assert_eq!(second_created.status, 201);
    assert_eq!(first_created.status, 201);
    assert_eq!(first_creating.state(), Some("creating"));
    assert_eq!(second_active.state(), Some("active"));
    assert_eq!(first_active.state(), Some("active"));
    assert_ne!(first_handle.state().await.unwrap(), second_handle.state().await.unwrap());

    first.reset().await.unwrap();
    second.reset().await.unwrap();
}

#[tokio::test]
async fn should_isolate_clients_sharing_a_server() {
    let server_ports = start_server().await;
    let first_client = connect(&server_ports).await;
    let second_client = connect(&server_ports).await;
    let resource = shared_resource();
    let params = test_params();
    let name = generate_name("shared");
    let mut first = first_client.scenario(name.clone(), &params);
    let mut second = second_client.scenario(name, &params);
    let mut configurator = first.start_configuration();
    configurator
        .register_lifecycle(&resource, &[Step::Create, Step::GetActive])
        .unwrap();
    first.finish_configuration(configurator).await.unwrap();
    let mut configurator = second.start_configuration();
    configurator
        .register_lifecycle(&resource, &[Step::Create, Step::GetCreating])
        .unwrap();
    let second_handle = second.finish_configuration(configurator).await.unwrap();
    let first_sdk = Sdk::new(first.url(), &params);
    let second_sdk = Sdk::new(second.url(), &params);

    assert_ne!(first.url(), second.url());
    assert_eq!(first_sdk.put(&resource.path, &json!({})).await.status, 201);
    assert_eq!(first_sdk.get(&resource.path).await.state(), Some("active"));

    first.reset().await.unwrap();

    assert_eq!(first_sdk.get(&resource.path).await.status, 404);
    assert_eq!(second_sdk.put(&resource.path, &json!({})).await.status, 201);
    assert_eq!(second_sdk.get(&resource.path).await.state(), Some("creating"));
    second.reset().await.unwrap();
    assert_eq!(second_handle.state().await.unwrap(), None);
}

#[tokio::test]
async fn should_start_afresh_when_name_is_reused_after_reset() {
    let client = setup().await;
    let params = test_params();
    let resource = shared_resource();
    let name = generate_name("reused");
    let mut scenario = client.scenario(name.clone(), &params);
    let sdk = Sdk::new(scenario.url(), &params);
    let mut configurator = scenario.start_configuration();
    configurator
        .register_lifecycle(&resource, &[Step::Create, Step::GetActive])
        .unwrap();
    let handle = scenario.finish_configuration(configurator).await.unwrap();
    sdk.put(&resource.path, &json!({})).await;
    sdk.get(&resource.path).await;

    scenario.reset().await.unwrap();

    assert_eq!(handle.state().await.unwrap(), None);
    assert_eq!(sdk.get(&resource.path).await.status, 404);

    let mut reused = client.scenario(name, &params);
    let mut configurator = reused.start_configuration();
    configurator
        .register_lifecycle(&resource, &[Step::Create, Step::GetActive])
        .unwrap();
    let handle = reused.finish_configuration(configurator).await.unwrap();

    assert_eq!(handle.state().await.unwrap(), Some("Started".to_string()));
    assert_eq!(sdk.put(&resource.path, &json!({})).await.status, 201);
    assert_eq!(sdk.get(&resource.path).await.state(), Some("active"));
}

#[tokio::test]
async fn should_skip_reset_when_nothing_was_uploaded() {
    let client = setup().await;
    let params = test_params();
    let name = generate_name("unfinished");
    let mut uploaded = client.scenario(name.clone(), &params);
    let mut configurator = uploaded.start_configuration();
    configurator
        .register_lifecycle(&shared_resource(), &[Step::Create])
        .unwrap();
    let handle = uploaded.finish_configuration(configurator).await.unwrap();
    let mut abandoned = client.scenario(name, &params);
    let _configurator = abandoned.start_configuration();

    abandoned.reset().await.unwrap();

    assert_eq!(handle.state().await.unwrap(), Some("Started".to_string()));
}

#[tokio::test]
async fn should_reset_all_scenarios_but_keep_unscoped_rules() {
    let client = setup().await;
    let params = test_params();
    let unscoped = random_path();
    client
        .when(|when| when.path(&unscoped))
        .then(|then| then.status(204))
        .send()
        .await
        .unwrap();
    let mut first = client.scenario(generate_name("first"), &params);
    let mut configurator = first.start_configuration();
    configurator
        .register_lifecycle(&shared_resource(), &Step::FULL)
        .unwrap();
    let first_handle = first.finish_configuration(configurator).await.unwrap();
    let mut second = client.scenario(generate_name("second"), &params);
    let mut configurator = second.start_configuration();
    configurator
        .register_lifecycle(&shared_resource(), &[Step::Create])
        .unwrap();
    let second_handle = second.finish_configuration(configurator).await.unwrap();

    let removed = first_handle.reset_all_scenarios().await.unwrap();

    assert_eq!(removed, 9);
    assert_eq!(first_handle.state().await.unwrap(), None);
    assert_eq!(second_handle.state().await.unwrap(), None);
    let response = reqwest::get(format!("{}{}", client.url(), unscoped))
        .await
        .unwrap();
    assert_eq!(response.status(), 204);
    assert_eq!(client.reset_all_scenarios().await, Ok(0));
}

async fn setup() -> Client {
    let server_ports = start_server().await;
    connect(&server_ports).await
}
