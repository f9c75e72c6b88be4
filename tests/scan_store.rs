use frameprint::db::{ScanStore, DB_VERSION};
use frameprint::faces::{BoundingBox, DetectionRecord, FaceDetection};
use frameprint::frames::FrameSample;
use rusqlite::Connection;
use tempfile::TempDir;

fn sample(frame_number: u32, difference: f64) -> FrameSample {
    FrameSample::new(frame_number, difference, [10.0, 20.0, 30.0])
}

#[test]
fn overlapping_batches_keep_the_last_write() {
    let mut store = ScanStore::open_in_memory().unwrap();
    store
        .upsert_frames("clip-1", &[sample(0, 1.0), sample(1, 2.0), sample(2, 3.0)])
        .unwrap();
    store
        .upsert_frames("clip-1", &[sample(1, 42.0), sample(3, 4.0)])
        .unwrap();

    let frames = store.get_frames("clip-1").unwrap();
    let values: Vec<(u32, Option<f64>)> = frames
        .iter()
        .map(|s| (s.frame_number, s.difference_value))
        .collect();
    assert_eq!(
        values,
        vec![(0, Some(1.0)), (1, Some(42.0)), (2, Some(3.0)), (3, Some(4.0))]
    );
}

#[test]
fn deleted_table_reads_empty() {
    let mut store = ScanStore::open_in_memory().unwrap();
    store.upsert_frames("clip-1", &[sample(0, 1.0)]).unwrap();

    store.delete_table("clip-1").unwrap();

    assert!(store.get_frames("clip-1").unwrap().is_empty());
    assert_eq!(store.get_scanned_count("clip-1").unwrap(), 0);
}

#[test]
fn delete_all_tables_only_touches_scan_tables() {
    let mut store = ScanStore::open_in_memory().unwrap();
    store.upsert_frames("a", &[sample(0, 1.0)]).unwrap();
    store.upsert_frames("b", &[sample(0, 1.0)]).unwrap();
    store.save_state("ui", "{}").unwrap();

    assert_eq!(store.delete_all_tables().unwrap(), 2);
    assert!(store.get_frames("a").unwrap().is_empty());
    assert!(store.load_state("ui").unwrap().is_some());
}

#[test]
fn frames_and_faces_persist_across_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("frames.db");
    let face = FaceDetection::new(
        5,
        "5-0",
        vec![0.1, 0.2, 0.3],
        BoundingBox {
            x: 10.0,
            y: 10.0,
            width: 64.0,
            height: 80.0,
        },
        0.93,
    );

    {
        let mut store = ScanStore::open(&path).unwrap();
        store
            .upsert_frames("3f2a-77", &[sample(4, 0.5), sample(5, 8.0)])
            .unwrap();
        store
            .upsert_faces("3f2a-77", &[DetectionRecord::with_faces(5, vec![face.clone()])])
            .unwrap();
    }

    let store = ScanStore::open(&path).unwrap();
    assert_eq!(store.schema_version().unwrap(), DB_VERSION);
    assert_eq!(store.get_scanned_count("3f2a-77").unwrap(), 2);

    let faces = store.get_faces("3f2a-77", Some(&[5])).unwrap();
    assert_eq!(faces.len(), 1);
    let record = faces[0].as_ref().unwrap();
    assert_eq!(record.largest_size, 80.0);
    assert_eq!(record.faces_array, vec![face]);
}

#[test]
fn failed_face_batch_leaves_earlier_payloads_alone() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("frames.db");
    let mut store = ScanStore::open(&path).unwrap();
    store
        .upsert_faces("clip-1", &[DetectionRecord::empty(0)])
        .unwrap();
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            r#"
            CREATE TRIGGER reject_frame_three BEFORE INSERT ON "frameScan_clip_1"
            WHEN NEW.frameNumber = 3
            BEGIN SELECT RAISE(ABORT, 'rejected'); END;
            "#,
        )
        .unwrap();
    }

    let batch: Vec<DetectionRecord> = (1..6).map(DetectionRecord::empty).collect();
    assert!(store.upsert_faces("clip-1", &batch).is_err());

    let faces = store.get_faces("clip-1", None).unwrap();
    assert_eq!(faces.len(), 1);
    assert_eq!(faces[0].as_ref().unwrap().frame_number, 0);
}

#[test]
fn legacy_database_is_migrated_on_open() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("legacy.db");
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE frameScanList (fileId TEXT, frameNumber INTEGER, meanValue REAL, meanColor TEXT);
            INSERT INTO frameScanList VALUES ('ab-cd', 0, 0.0, '[1.0,2.0,3.0]');
            INSERT INTO frameScanList VALUES ('ab-cd', 1, 12.5, '[4.0,5.0,6.0]');
            INSERT INTO frameScanList VALUES ('ef', 0, 3.0, NULL);
            "#,
        )
        .unwrap();
    }

    let store = ScanStore::open(&path).unwrap();

    assert_eq!(store.schema_version().unwrap(), 2);
    assert!(!store.table_exists("frameScanList").unwrap());
    assert_eq!(
        store.scan_tables().unwrap(),
        vec!["frameScan_ab_cd".to_string(), "frameScan_ef".to_string()]
    );
    let frames = store.get_frames("ab-cd").unwrap();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[1].difference_value, Some(12.5));
    assert_eq!(frames[1].mean_color, Some([4.0, 5.0, 6.0]));
}

#[test]
fn failed_migration_is_retried_on_next_open() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.db");
    {
        let conn = Connection::open(&path).unwrap();
        // Legacy table without the fileId column the split needs.
        conn.execute_batch("CREATE TABLE frameScanList (frameNumber INTEGER, meanValue REAL, meanColor TEXT)")
            .unwrap();
    }

    {
        let store = ScanStore::open(&path).unwrap();
        assert_eq!(store.schema_version().unwrap(), 1);
    }

    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            r#"
            DROP TABLE frameScanList;
            CREATE TABLE frameScanList (fileId TEXT, frameNumber INTEGER, differenceValue REAL, meanColor TEXT);
            INSERT INTO frameScanList VALUES ('late', 0, 1.0, NULL);
            "#,
        )
        .unwrap();
    }

    let store = ScanStore::open(&path).unwrap();
    assert_eq!(store.schema_version().unwrap(), 2);
    assert_eq!(store.get_scanned_count("late").unwrap(), 1);
}
