//! Router tests: a real in-memory SQLite store behind fake camera, embedder
//! and notice sink, driven through `tower::ServiceExt::oneshot`.

use std::sync::{
  Arc, Mutex,
  atomic::{AtomicBool, Ordering},
};

use axum::{
  body::Body,
  http::{Request, StatusCode},
};
use bytes::Bytes;
use chrono::{NaiveDate, NaiveDateTime};
use rollcall_core::{
  engine::ShiftEngine,
  matching::{Embedding, Gallery},
  notice::{Notice, NoticeKind},
  record::PersonId,
  station::{FaceEmbedder, Frame, ImageSource, NoticeSink, Station},
};
use rollcall_store_sqlite::SqliteStore;
use serde_json::Value;
use thiserror::Error;
use tower::ServiceExt as _;

use crate::{ApiState, api_router};

// ─── Fakes ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
#[error("{0}")]
struct FakeFailure(&'static str);

#[derive(Clone, Default)]
struct FakeCamera {
  offline: Arc<AtomicBool>,
}

impl ImageSource for FakeCamera {
  type Error = FakeFailure;

  async fn capture(&self) -> Result<Frame, FakeFailure> {
    if self.offline.load(Ordering::SeqCst) {
      return Err(FakeFailure("camera timed out"));
    }
    Ok(Frame {
      bytes:        Bytes::from_static(b"\xff\xd8frame"),
      content_type: "image/jpeg".into(),
    })
  }
}

/// `Ok(None)` inside the mutex means "no face in the picture".
#[derive(Clone)]
struct FakeEmbedder {
  face: Arc<Mutex<Result<Option<Vec<f32>>, &'static str>>>,
}

impl FaceEmbedder for FakeEmbedder {
  type Error = FakeFailure;

  async fn embed<'a>(&'a self, _frame: &'a Frame) -> Result<Option<Embedding>, FakeFailure> {
    match self.face.lock().unwrap().clone() {
      Ok(Some(values)) => Ok(Some(Embedding::new(values).unwrap())),
      Ok(None) => Ok(None),
      Err(msg) => Err(FakeFailure(msg)),
    }
  }
}

#[derive(Clone, Default)]
struct FakeSink {
  sent: Arc<Mutex<Vec<Notice>>>,
}

impl NoticeSink for FakeSink {
  fn submit(&self, notice: Notice, _frame: Frame) { self.sent.lock().unwrap().push(notice); }
}

// ─── Harness ─────────────────────────────────────────────────────────────────

type TestState = ApiState<SqliteStore, FakeCamera, FakeEmbedder, FakeSink>;

struct Kiosk {
  state:    TestState,
  camera:   FakeCamera,
  embedder: FakeEmbedder,
  sink:     FakeSink,
  now:      Arc<Mutex<NaiveDateTime>>,
}

impl Kiosk {
  fn set_time(&self, at: NaiveDateTime) { *self.now.lock().unwrap() = at; }

  fn show_face(&self, face: Result<Option<Vec<f32>>, &'static str>) {
    *self.embedder.face.lock().unwrap() = face;
  }

  async fn request(&self, method: &str, uri: &str) -> (StatusCode, Value) {
    let req = Request::builder()
      .method(method)
      .uri(uri)
      .body(Body::empty())
      .unwrap();
    let resp = api_router(self.state.clone()).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let body = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
  }
}

fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
  NaiveDate::from_ymd_opt(2024, 3, day)
    .unwrap()
    .and_hms_opt(h, m, 0)
    .unwrap()
}

async fn kiosk() -> Kiosk {
  let mut gallery = Gallery::new();
  gallery
    .insert(PersonId::new("Anna").unwrap(), Embedding::new(vec![0.1, 0.0]).unwrap())
    .unwrap();
  gallery
    .insert(PersonId::new("Boris").unwrap(), Embedding::new(vec![0.0, 3.0]).unwrap())
    .unwrap();

  let store = SqliteStore::open_in_memory().await.unwrap();
  let camera = FakeCamera::default();
  let embedder = FakeEmbedder { face: Arc::new(Mutex::new(Ok(Some(vec![0.0, 0.0])))) };
  let sink = FakeSink::default();
  let now = Arc::new(Mutex::new(at(1, 9, 0)));

  let station = Station::new(
    ShiftEngine::new(Arc::new(store)),
    camera.clone(),
    embedder.clone(),
    sink.clone(),
    Arc::new(gallery),
  );
  let clock_now = Arc::clone(&now);
  let state = ApiState {
    station: Arc::new(station),
    clock:   Arc::new(move || *clock_now.lock().unwrap()),
  };

  Kiosk { state, camera, embedder, sink, now }
}

// ─── Check-in / check-out ────────────────────────────────────────────────────

#[tokio::test]
async fn check_in_returns_201_with_record_and_caption() {
  let k = kiosk().await;
  let (status, body) = k.request("POST", "/check-in").await;

  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["action"], "check_in");
  assert_eq!(body["record"]["person_id"], "Anna");
  assert_eq!(body["record"]["shift_label"], "morning");
  assert_eq!(body["record"]["started_at"], "2024-03-01T09:00:00");
  assert!(body["record"]["ended_at"].is_null());
  assert!((body["distance"].as_f64().unwrap() - 0.1).abs() < 1e-6);
  assert!(body["caption"].as_str().unwrap().starts_with("✅ Check-in"));

  let sent = k.sink.sent.lock().unwrap();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].kind, NoticeKind::CheckIn);
}

#[tokio::test]
async fn second_check_in_same_day_is_409() {
  let k = kiosk().await;
  k.request("POST", "/check-in").await;

  k.set_time(at(1, 13, 30));
  let (status, body) = k.request("POST", "/check-in").await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["reason"], "duplicate_check_in");
  assert_eq!(body["category"], "policy");
  assert_eq!(body["person_id"], "Anna");
  assert_eq!(k.sink.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn day_cycle_closes_with_original_label() {
  let k = kiosk().await;
  k.request("POST", "/check-in").await;

  k.set_time(at(1, 19, 5));
  let (status, body) = k.request("POST", "/check-out").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["action"], "check_out");
  assert_eq!(body["record"]["shift_label"], "morning");
  assert_eq!(body["record"]["ended_at"], "2024-03-01T19:05:00");
  assert_eq!(body["notice"]["kind"], "check_out");

  k.set_time(at(1, 19, 10));
  let (status, body) = k.request("POST", "/check-out").await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["reason"], "already_checked_out");
  assert_eq!(body["existing_end"], "2024-03-01T19:05:00");
}

#[tokio::test]
async fn check_out_without_check_in_is_409() {
  let k = kiosk().await;
  let (status, body) = k.request("POST", "/check-out").await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["reason"], "no_open_shift_today");
  assert!(k.sink.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn yesterdays_open_shift_does_not_count() {
  let k = kiosk().await;
  k.set_time(at(1, 23, 30));
  k.request("POST", "/check-in").await;

  k.set_time(at(2, 7, 0));
  let (status, body) = k.request("POST", "/check-out").await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["reason"], "no_open_shift_today");
}

// ─── Recognition and collaborator failures ───────────────────────────────────

#[tokio::test]
async fn unknown_face_is_422() {
  let k = kiosk().await;
  k.show_face(Ok(Some(vec![5.0, 5.0])));

  let (status, body) = k.request("POST", "/check-in").await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["reason"], "no_match");
  assert_eq!(body["category"], "recognition");
  assert!(body["nearest_distance"].is_number());
  assert!(body.get("person_id").is_none());
}

#[tokio::test]
async fn empty_picture_is_422() {
  let k = kiosk().await;
  k.show_face(Ok(None));

  let (status, body) = k.request("POST", "/check-in").await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["reason"], "no_face_found");
}

#[tokio::test]
async fn collaborator_outages_are_503() {
  let k = kiosk().await;
  k.camera.offline.store(true, Ordering::SeqCst);
  let (status, body) = k.request("POST", "/check-in").await;
  assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
  assert_eq!(body["reason"], "camera_unavailable");
  assert_eq!(body["category"], "failure");

  k.camera.offline.store(false, Ordering::SeqCst);
  k.show_face(Err("connection refused"));
  let (status, body) = k.request("POST", "/check-out").await;
  assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
  assert_eq!(body["reason"], "embedder_unavailable");

  let (_, records) = k.request("GET", "/records").await;
  assert_eq!(records.as_array().unwrap().len(), 0);
}

// ─── Records ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn records_can_be_listed_filtered_and_fetched() {
  let k = kiosk().await;
  let (_, first) = k.request("POST", "/check-in").await;

  k.show_face(Ok(Some(vec![0.0, 3.2])));
  k.set_time(at(1, 12, 15));
  k.request("POST", "/check-in").await;

  k.show_face(Ok(Some(vec![0.0, 0.0])));
  k.set_time(at(2, 8, 0));
  k.request("POST", "/check-in").await;

  let (status, all) = k.request("GET", "/records").await;
  assert_eq!(status, StatusCode::OK);
  let all = all.as_array().unwrap();
  assert_eq!(all.len(), 3);
  assert_eq!(all[0]["started_at"], "2024-03-02T08:00:00");

  let (_, boris) = k.request("GET", "/records?person_id=Boris").await;
  let boris = boris.as_array().unwrap();
  assert_eq!(boris.len(), 1);
  assert_eq!(boris[0]["shift_label"], "day");

  let (_, day_one) = k.request("GET", "/records?day=2024-03-01&limit=1").await;
  let day_one = day_one.as_array().unwrap();
  assert_eq!(day_one.len(), 1);
  assert_eq!(day_one[0]["person_id"], "Boris");

  let id = first["record"]["id"].as_str().unwrap();
  let (status, one) = k.request("GET", &format!("/records/{id}")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(one["person_id"], "Anna");
}

#[tokio::test]
async fn unknown_record_is_404() {
  let k = kiosk().await;
  let (status, body) = k
    .request("GET", "/records/0190e2b4-5c1e-7000-8000-000000000000")
    .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn malformed_query_is_400() {
  let k = kiosk().await;
  let (status, _) = k.request("GET", "/records/not-a-uuid").await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = k.request("GET", "/records?day=yesterday").await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ─── Gallery ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn gallery_summary_lists_people() {
  let k = kiosk().await;
  let (status, body) = k.request("GET", "/gallery").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["count"], 2);
  assert_eq!(body["dimension"], 2);
  assert_eq!(body["person_ids"], serde_json::json!(["Anna", "Boris"]));
}
