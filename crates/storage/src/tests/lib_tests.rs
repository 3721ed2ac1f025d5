use super::*;
use chrono::Duration;
use shared::domain::AnalysisId;
use shared::protocol::AnalysisRecord;

fn sample_record(filename: &str, timestamp: DateTime<Utc>) -> AnalysisRecord {
    AnalysisRecord {
        id: AnalysisId::random(),
        filename: filename.into(),
        image_base64: "aW1hZ2UtYnl0ZXM=".into(),
        analysis: "DESCRIPTION: A cat on a windowsill".into(),
        objects_detected: vec!["cat".into(), "windowsill".into()],
        text_found: String::new(),
        emotions: vec!["calm".into()],
        scene_description: "Indoor domestic scene".into(),
        confidence: "High".into(),
        timestamp,
    }
}

#[tokio::test]
async fn insert_then_load_round_trips_record() {
    let storage = Storage::new("sqlite::memory:").await.expect("storage");
    let record = sample_record("cat.png", Utc::now());
    storage.insert_analysis(&record).await.expect("insert");

    let loaded = storage
        .load_analysis(record.id)
        .await
        .expect("load")
        .expect("record exists");
    assert_eq!(loaded.filename, "cat.png");
    assert_eq!(loaded.objects_detected, record.objects_detected);
    assert_eq!(loaded.emotions, record.emotions);
    assert_eq!(loaded.confidence, "High");
}

#[tokio::test]
async fn unknown_id_loads_nothing() {
    let storage = Storage::new("sqlite::memory:").await.expect("storage");
    let loaded = storage.load_analysis(AnalysisId::random()).await.expect("load");
    assert!(loaded.is_none());
}

#[tokio::test]
async fn history_is_newest_first_and_capped() {
    let storage = Storage::new("sqlite::memory:").await.expect("storage");
    let base = Utc::now();
    for i in 0..(HISTORY_LIMIT + 5) {
        let record = sample_record(
            &format!("photo_{i}.png"),
            base + Duration::seconds(i as i64),
        );
        storage.insert_analysis(&record).await.expect("insert");
    }

    let history = storage.list_recent_analyses().await.expect("history");
    assert_eq!(history.len(), HISTORY_LIMIT as usize);
    assert_eq!(history[0].filename, format!("photo_{}.png", HISTORY_LIMIT + 4));
    assert!(history[0].timestamp > history[1].timestamp);
}

#[tokio::test]
async fn delete_removes_record_and_reports_misses() {
    let storage = Storage::new("sqlite::memory:").await.expect("storage");
    let record = sample_record("gone.png", Utc::now());
    storage.insert_analysis(&record).await.expect("insert");

    assert!(storage.delete_analysis(record.id).await.expect("delete"));
    assert!(storage
        .load_analysis(record.id)
        .await
        .expect("load")
        .is_none());
    assert!(!storage.delete_analysis(record.id).await.expect("delete"));
}

#[tokio::test]
async fn health_check_pings_database() {
    let storage = Storage::new("sqlite::memory:").await.expect("storage");
    storage.health_check().await.expect("healthy");
}
