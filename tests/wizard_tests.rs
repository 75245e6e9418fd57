/// Wizard behaviour tests
/// Covers step validation, option toggling, draft persistence and the staged submission flow
use rust_leads_api::config::Config;
use rust_leads_api::handlers::AppState;
use rust_leads_api::routes::router;
use rust_leads_api::schema::{ASSESSMENT, INTAKE, OTHER_CUSTOM};
use rust_leads_api::storage::Storage;
use rust_leads_api::validation::FieldSource;
use rust_leads_api::wizard::{Advance, DraftStore, FieldValue, FileDraftStore, MemoryDraftStore, Wizard};
use rust_leads_api::wizard_client::ApiClient;
use std::sync::Arc;

fn fill_step_one<S: DraftStore>(wizard: &mut Wizard<S>) {
    wizard.update_field("company", "Acme Manufacturing").unwrap();
    wizard.update_field("industry", "manufacturing").unwrap();
}

/// Drives an assessment wizard from step 1 to the final payload.
fn complete_assessment<S: DraftStore>(wizard: &mut Wizard<S>) -> Advance {
    fill_step_one(wizard);
    assert_eq!(wizard.next().unwrap(), Advance::Moved(2));
    wizard.toggle_option("currentSystems", "erp", true).unwrap();
    assert_eq!(wizard.next().unwrap(), Advance::Moved(3));
    wizard.toggle_option("businessGoals", "reduce-costs", true).unwrap();
    assert_eq!(wizard.next().unwrap(), Advance::Moved(4));
    wizard.toggle_option("challenges", "legacy-systems", true).unwrap();
    wizard.update_field("timeline", "3-6-months").unwrap();
    assert_eq!(wizard.next().unwrap(), Advance::Moved(5));
    wizard.update_field("name", "Ada Lovelace").unwrap();
    wizard.update_field("email", "ada@example.com").unwrap();
    wizard.update_field("consent", true).unwrap();
    wizard.next().unwrap()
}

#[test]
fn test_next_on_invalid_step_does_not_advance() {
    let mut wizard = Wizard::resume(&ASSESSMENT, MemoryDraftStore::new()).unwrap();

    assert_eq!(wizard.next().unwrap(), Advance::Blocked);
    assert_eq!(wizard.current_step(), 1);
    assert_eq!(wizard.errors().len(), 2);
    assert_eq!(wizard.errors().get("company"), Some("Company name is required"));
    assert_eq!(wizard.errors().get("industry"), Some("Please select your industry"));
}

#[test]
fn test_update_field_clears_its_error() {
    let mut wizard = Wizard::resume(&ASSESSMENT, MemoryDraftStore::new()).unwrap();
    wizard.next().unwrap();

    wizard.update_field("company", "Acme").unwrap();
    assert!(wizard.errors().get("company").is_none());
    assert!(wizard.errors().get("industry").is_some());
}

#[test]
fn test_contact_step_rules() {
    let mut wizard = Wizard::resume(&ASSESSMENT, MemoryDraftStore::new()).unwrap();
    wizard.update_field("email", "not-an-email").unwrap();

    let errors = wizard.validate_step(5);
    assert_eq!(errors.get("name"), Some("Name is required"));
    assert_eq!(errors.get("email"), Some("Please enter a valid email address"));
    assert_eq!(errors.get("consent"), Some("You must agree to be contacted"));
}

#[test]
fn test_unchecking_other_custom_clears_text() {
    let mut wizard = Wizard::resume(&ASSESSMENT, MemoryDraftStore::new()).unwrap();
    fill_step_one(&mut wizard);
    wizard.next().unwrap();

    wizard.toggle_option("currentSystems", "erp", true).unwrap();
    wizard.toggle_option("currentSystems", OTHER_CUSTOM, true).unwrap();
    wizard.update_field("otherSystem", "In-house COBOL billing").unwrap();
    assert_eq!(wizard.draft().text("otherSystem"), Some("In-house COBOL billing"));

    wizard.toggle_option("currentSystems", OTHER_CUSTOM, false).unwrap();
    assert!(wizard.draft().fields.get("otherSystem").is_none());
    assert_eq!(wizard.draft().choices("currentSystems"), vec!["erp"]);
}

#[test]
fn test_other_text_typed_before_checking_is_kept() {
    let mut wizard = Wizard::resume(&ASSESSMENT, MemoryDraftStore::new()).unwrap();
    fill_step_one(&mut wizard);
    wizard.next().unwrap();

    wizard.update_field("otherSystem", "Custom WMS").unwrap();
    assert_eq!(wizard.draft().text("otherSystem"), Some("Custom WMS"));

    wizard.toggle_option("currentSystems", OTHER_CUSTOM, true).unwrap();
    assert_eq!(wizard.draft().text("otherSystem"), Some("Custom WMS"));
    assert_eq!(wizard.next().unwrap(), Advance::Moved(3));

    wizard.back();
    wizard.toggle_option("currentSystems", OTHER_CUSTOM, false).unwrap();
    assert!(wizard.draft().fields.get("otherSystem").is_none());
}

#[test]
fn test_intake_description_typed_before_environment_is_kept() {
    let mut wizard = Wizard::resume(&INTAKE, MemoryDraftStore::new()).unwrap();
    wizard.update_field("otherEnvironment", "VAX/VMS").unwrap();
    wizard.update_field("legacyEnvironment", "other").unwrap();
    assert_eq!(wizard.draft().text("otherEnvironment"), Some("VAX/VMS"));
}

#[test]
fn test_other_custom_text_required_while_checked() {
    let mut wizard = Wizard::resume(&ASSESSMENT, MemoryDraftStore::new()).unwrap();
    fill_step_one(&mut wizard);
    wizard.next().unwrap();

    wizard.toggle_option("currentSystems", OTHER_CUSTOM, true).unwrap();
    assert_eq!(wizard.next().unwrap(), Advance::Blocked);
    assert_eq!(
        wizard.errors().get("otherSystem"),
        Some("Please describe your other system")
    );

    // Unchecking removes both the requirement and the stale error
    wizard.toggle_option("currentSystems", OTHER_CUSTOM, false).unwrap();
    assert!(wizard.errors().get("otherSystem").is_none());
}

#[test]
fn test_toggle_is_idempotent() {
    let mut wizard = Wizard::resume(&ASSESSMENT, MemoryDraftStore::new()).unwrap();
    wizard.toggle_option("challenges", "cost", true).unwrap();
    wizard.toggle_option("challenges", "cost", true).unwrap();
    assert_eq!(wizard.draft().choices("challenges"), vec!["cost"]);

    wizard.toggle_option("challenges", "speed", false).unwrap();
    assert_eq!(wizard.draft().choices("challenges"), vec!["cost"]);
}

#[test]
fn test_intake_environment_change_clears_description() {
    let mut wizard = Wizard::resume(&INTAKE, MemoryDraftStore::new()).unwrap();
    wizard.update_field("legacyEnvironment", "other").unwrap();
    wizard.update_field("otherEnvironment", "VAX/VMS").unwrap();
    assert!(wizard.draft().fields.contains_key("otherEnvironment"));

    wizard.update_field("legacyEnvironment", "mainframe").unwrap();
    assert!(!wizard.draft().fields.contains_key("otherEnvironment"));
}

#[test]
fn test_back_preserves_draft() {
    let mut wizard = Wizard::resume(&ASSESSMENT, MemoryDraftStore::new()).unwrap();
    fill_step_one(&mut wizard);
    wizard.next().unwrap();
    assert_eq!(wizard.current_step(), 2);

    wizard.back();
    assert_eq!(wizard.current_step(), 1);
    assert_eq!(wizard.draft().text("company"), Some("Acme Manufacturing"));
    wizard.back();
    assert_eq!(wizard.current_step(), 1);
}

#[test]
fn test_last_step_yields_payload_and_finish_clears() {
    let mut wizard = Wizard::resume(&ASSESSMENT, MemoryDraftStore::new()).unwrap();

    let Advance::Submit(payload) = complete_assessment(&mut wizard) else {
        panic!("expected the final step to yield a payload");
    };
    assert_eq!(payload["company"], "Acme Manufacturing");
    assert_eq!(payload["consent"], true);
    assert_eq!(payload["currentSystems"], serde_json::json!(["erp"]));
    assert_eq!(wizard.current_step(), 5);
    assert_eq!(wizard.draft().progress, 5);

    wizard.finish().unwrap();
    assert_eq!(wizard.current_step(), 1);
    assert!(wizard.draft().fields.is_empty());
}

#[test]
fn test_file_store_resumes_at_furthest_step() {
    let dir = tempfile::tempdir().unwrap();

    {
        let mut wizard = Wizard::resume(&ASSESSMENT, FileDraftStore::new(dir.path())).unwrap();
        fill_step_one(&mut wizard);
        wizard.next().unwrap();
        wizard.toggle_option("currentSystems", "crm", true).unwrap();
        wizard.next().unwrap();
        assert_eq!(wizard.current_step(), 3);
    }

    let wizard = Wizard::resume(&ASSESSMENT, FileDraftStore::new(dir.path())).unwrap();
    assert_eq!(wizard.current_step(), 3);
    assert_eq!(wizard.draft().progress, 2);
    assert_eq!(
        wizard.draft().fields.get("currentSystems"),
        Some(&FieldValue::Choices(vec!["crm".to_string()]))
    );
}

#[test]
fn test_file_store_clear_and_corrupt_drafts() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileDraftStore::new(dir.path());

    assert!(store.load("assessment").unwrap().is_none());
    // Clearing a missing draft is not an error
    store.clear("assessment").unwrap();

    std::fs::write(dir.path().join("assessment-draft.json"), b"{ broken").unwrap();
    assert!(store.load("assessment").unwrap().is_none());

    let mut wizard = Wizard::resume(&ASSESSMENT, FileDraftStore::new(dir.path())).unwrap();
    assert_eq!(wizard.current_step(), 1);
    fill_step_one(&mut wizard);
    wizard.finish().unwrap();
    assert!(!dir.path().join("assessment-draft.json").exists());
}

async fn spawn_server() -> (String, Arc<Storage>) {
    let store = Arc::new(Storage::new());
    let state = Arc::new(AppState::new(Config::default(), store.clone()).unwrap());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    (format!("http://{}", addr), store)
}

#[tokio::test]
async fn test_staged_submission_against_server() {
    let (base_url, store) = spawn_server().await;
    let client = ApiClient::new(base_url).unwrap();
    let mut wizard = Wizard::resume(&ASSESSMENT, MemoryDraftStore::new()).unwrap();

    fill_step_one(&mut wizard);
    assert_eq!(wizard.next().unwrap(), Advance::Moved(2));
    let created = client.record_step(&mut wizard).await.unwrap();
    assert_eq!(created.progress, 1);
    assert!(!created.completed);
    assert_eq!(wizard.remote_id(), Some(created.id));

    wizard.toggle_option("currentSystems", "erp", true).unwrap();
    wizard.next().unwrap();
    let updated = client.record_step(&mut wizard).await.unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.progress, 2);

    wizard.toggle_option("businessGoals", "reduce-costs", true).unwrap();
    wizard.next().unwrap();
    wizard.toggle_option("challenges", "legacy-systems", true).unwrap();
    wizard.update_field("timeline", "3-6-months").unwrap();
    wizard.next().unwrap();
    wizard.update_field("name", "Ada Lovelace").unwrap();
    wizard.update_field("email", "ada@example.com").unwrap();
    wizard.update_field("consent", true).unwrap();
    assert!(matches!(wizard.next().unwrap(), Advance::Submit(_)));

    let submitted = client
        .submit(&mut wizard, "recaptcha-load-failed")
        .await
        .unwrap();
    assert!(submitted.success);
    assert!(submitted.data.completed);
    assert_eq!(submitted.data.company.as_deref(), Some("Acme Manufacturing"));
    assert!(wizard.draft().fields.is_empty());
    assert_eq!(store.get_assessments_by_email("ada@example.com").len(), 1);
}

#[tokio::test]
async fn test_rejected_submission_keeps_draft() {
    let (base_url, _) = spawn_server().await;
    let client = ApiClient::new(base_url).unwrap();
    let mut wizard = Wizard::resume(&ASSESSMENT, MemoryDraftStore::new()).unwrap();
    fill_step_one(&mut wizard);

    // Only step 1 is filled, so the server rejects the full submission
    assert!(client.submit(&mut wizard, "token").await.is_err());
    assert_eq!(wizard.draft().text("company"), Some("Acme Manufacturing"));
}
