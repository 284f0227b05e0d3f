use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_openai::types::chat::{CreateChatCompletionRequest, CreateChatCompletionResponse};
use ballot_proof::error::{AppError, AppResult, LlmError};
use ballot_proof::models::{JobStatus, Level, SessionEventType};
use ballot_proof::services::session_logger::REDACTED_IMAGE_MARKER;
use ballot_proof::{logger, App, BallotAnalyzer, Config, VisionModel};
use futures::future::join_all;
use serde_json::json;
use tokio::sync::Notify;
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR-fake-ballot-body";
const CONTESTS: &str = "Treasurer (1)\n  Reporting Units: 7\n  Jane Doe\n  John Roe\n";
const JANE_DOE_ANSWER: &str =
    "The oval is missing for Jane Doe in the Treasurer contest, high confidence.";

fn canned_response(answer: &str) -> AppResult<CreateChatCompletionResponse> {
    Ok(serde_json::from_value(json!({
        "id": "chatcmpl-fake",
        "object": "chat.completion",
        "created": 1_700_000_000u32,
        "model": "fake-vision",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": answer },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 1200, "completion_tokens": 30, "total_tokens": 1230 }
    }))?)
}

/// 固定回答，并记录调用次数
struct CannedModel {
    answer: &'static str,
    calls: Arc<AtomicUsize>,
}

impl CannedModel {
    fn new(answer: &'static str) -> Self {
        Self {
            answer,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl VisionModel for CannedModel {
    fn model_name(&self) -> &str {
        "fake-vision"
    }

    async fn complete(
        &self,
        _request: CreateChatCompletionRequest,
    ) -> AppResult<CreateChatCompletionResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        canned_response(self.answer)
    }
}

/// 永远调用失败
struct FailingModel;

impl VisionModel for FailingModel {
    fn model_name(&self) -> &str {
        "failing-vision"
    }

    async fn complete(
        &self,
        _request: CreateChatCompletionRequest,
    ) -> AppResult<CreateChatCompletionResponse> {
        Err(AppError::llm_api_failed(
            "failing-vision",
            std::io::Error::other("rate limited"),
        ))
    }
}

/// 等到放行才返回
struct GatedModel {
    gate: Arc<Notify>,
}

impl VisionModel for GatedModel {
    fn model_name(&self) -> &str {
        "gated-vision"
    }

    async fn complete(
        &self,
        _request: CreateChatCompletionRequest,
    ) -> AppResult<CreateChatCompletionResponse> {
        self.gate.notified().await;
        canned_response(JANE_DOE_ANSWER)
    }
}

fn temp_root() -> PathBuf {
    std::env::temp_dir().join(format!("ballot-proof-{}", Uuid::new_v4()))
}

fn test_config(root: &Path) -> Config {
    Config {
        upload_folder: root.join("uploads").display().to_string(),
        sessions_dir: root.join("sessions").display().to_string(),
        poll_interval_ms: 10,
        ..Config::default()
    }
}

fn analyzer<M: VisionModel>(model: M) -> BallotAnalyzer<M> {
    logger::init();
    BallotAnalyzer::new(test_config(&temp_root()), model)
}

/// 上传一张图片和候选人数据，返回 (file_id, data_id)
async fn upload_inputs<M: VisionModel>(analyzer: &BallotAnalyzer<M>) -> (String, String) {
    let image = assert_ok!(analyzer.upload_image("ballot.png", PNG_BYTES).await);
    let contests = assert_ok!(analyzer.upload_contests(CONTESTS).await);
    (image.file_id, contests.data_id)
}

async fn wait_for_terminal<M: VisionModel>(analyzer: &BallotAnalyzer<M>, job_id: &str) -> JobStatus {
    for _ in 0..500 {
        let status = assert_ok!(analyzer.status(job_id).await);
        if status.status.is_terminal() {
            return status.status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("任务 {} 没有在限定时间内结束", job_id);
}

#[tokio::test]
async fn test_full_pipeline_completes_with_findings() {
    let model = CannedModel::new(JANE_DOE_ANSWER);
    let calls = Arc::clone(&model.calls);
    let analyzer = analyzer(model);
    let (file_id, data_id) = upload_inputs(&analyzer).await;

    let submitted = assert_ok!(analyzer.submit(&file_id, &data_id).await);
    assert_eq!(submitted.status, JobStatus::Queued);

    assert_eq!(wait_for_terminal(&analyzer, &submitted.job_id).await, JobStatus::Completed);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let status = assert_ok!(analyzer.status(&submitted.job_id).await);
    assert_eq!(status.progress, 100);
    assert_eq!(status.message, "Analysis completed successfully");
    assert!(status.has_results);

    let results = assert_ok!(analyzer.results(&submitted.job_id).await);
    assert_eq!(results.results.raw_analysis, JANE_DOE_ANSWER);
    assert_eq!(results.completed_at, results.results.completed_at);

    let findings = &results.results.findings;
    assert_eq!(findings.missing_ovals.len(), 1);
    assert_eq!(findings.missing_ovals[0].confidence, Level::High);
    assert!(findings.missing_ovals[0]
        .candidate
        .as_deref()
        .unwrap()
        .starts_with("Jane Doe"));
    assert_eq!(
        findings.total_issues,
        findings.missing_ovals.len() + findings.other_issues.len()
    );
}

#[tokio::test]
async fn test_request_log_never_contains_image_payload() {
    let analyzer = analyzer(CannedModel::new(JANE_DOE_ANSWER));
    let (file_id, data_id) = upload_inputs(&analyzer).await;
    let job_id = assert_ok!(analyzer.submit(&file_id, &data_id).await).job_id;
    wait_for_terminal(&analyzer, &job_id).await;

    let view = assert_ok!(analyzer.logs(&job_id).await);
    assert_eq!(view.entry_count, view.logs.len());

    let raw = assert_ok!(tokio::fs::read_to_string(&view.log_file).await);
    let encoded = ballot_proof::services::vision_service::encode_image(PNG_BYTES);
    assert!(!raw.contains(&encoded));

    let request = view
        .logs
        .iter()
        .filter_map(|r| r.entry())
        .find(|e| e.event_type == SessionEventType::Request)
        .expect("缺少 request 日志");
    let image = &request.data["messages"][0]["content"][1]["image_url"];
    assert_eq!(image["url"], REDACTED_IMAGE_MARKER);
    assert_eq!(image["detail"], "high");
    assert_eq!(request.data["parameters"]["max_tokens"], 1500);

    let response = view
        .logs
        .iter()
        .filter_map(|r| r.entry())
        .find(|e| e.event_type == SessionEventType::Response)
        .expect("缺少 response 日志");
    assert_eq!(response.data["choices"][0]["message"]["content"], JANE_DOE_ANSWER);
    assert_eq!(response.data["usage"]["total_tokens"], 1230);
}

#[tokio::test]
async fn test_model_failure_resets_progress() {
    let analyzer = analyzer(FailingModel);
    let (file_id, data_id) = upload_inputs(&analyzer).await;
    let job_id = assert_ok!(analyzer.submit(&file_id, &data_id).await).job_id;

    assert_eq!(wait_for_terminal(&analyzer, &job_id).await, JobStatus::Error);

    let status = assert_ok!(analyzer.status(&job_id).await);
    assert_eq!(status.progress, 0);
    assert!(status.message.starts_with("Analysis failed: "));
    assert!(status.message.contains("rate limited"));
    assert!(!status.has_results);

    let err = assert_err!(analyzer.results(&job_id).await);
    assert!(matches!(err, AppError::NotCompleted { .. }));

    let view = assert_ok!(analyzer.logs(&job_id).await);
    let failure = view
        .logs
        .iter()
        .filter_map(|r| r.entry())
        .find(|e| e.event_type == SessionEventType::Error)
        .expect("缺少 error 日志");
    assert_eq!(failure.data["action"], "analysis_failed");
    assert_eq!(failure.data["error_type"], "llm");
}

#[tokio::test]
async fn test_checkpoints_and_results_before_completion() {
    let gate = Arc::new(Notify::new());
    let analyzer = analyzer(GatedModel {
        gate: Arc::clone(&gate),
    });
    let (file_id, data_id) = upload_inputs(&analyzer).await;
    let job_id = assert_ok!(analyzer.submit(&file_id, &data_id).await).job_id;

    // 模型被挡住时停在 30
    let mut seen = Vec::new();
    for attempt in 0.. {
        assert!(attempt < 1000, "进度没有到达 30: {:?}", seen);
        let status = assert_ok!(analyzer.status(&job_id).await);
        if seen.last() != Some(&status.progress) {
            seen.push(status.progress);
        }
        if status.progress == 30 {
            assert_eq!(status.status, JobStatus::Processing);
            assert_eq!(status.message, "Sending to OpenAI for visual analysis...");
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(seen.windows(2).all(|w| w[0] < w[1]));

    let err = assert_err!(analyzer.results(&job_id).await);
    assert!(matches!(err, AppError::NotCompleted { .. }));

    gate.notify_one();
    assert_eq!(wait_for_terminal(&analyzer, &job_id).await, JobStatus::Completed);
    assert_eq!(assert_ok!(analyzer.status(&job_id).await).progress, 100);
}

#[tokio::test]
async fn test_missing_image_file_fails_job() {
    let analyzer = analyzer(CannedModel::new(JANE_DOE_ANSWER));
    let (file_id, data_id) = upload_inputs(&analyzer).await;

    let image = assert_ok!(analyzer.image(&file_id).await);
    assert_ok!(tokio::fs::remove_file(&image.filepath).await);

    let job_id = assert_ok!(analyzer.submit(&file_id, &data_id).await).job_id;
    assert_eq!(wait_for_terminal(&analyzer, &job_id).await, JobStatus::Error);

    let status = assert_ok!(analyzer.status(&job_id).await);
    assert_eq!(status.progress, 0);
}

#[tokio::test]
async fn test_concurrent_submissions_are_independent() {
    let model = CannedModel::new("No oval for John Roe.\nMinor alignment issue in column 3.");
    let calls = Arc::clone(&model.calls);
    let analyzer = analyzer(model);
    let (file_id, data_id) = upload_inputs(&analyzer).await;

    let submissions = join_all((0..5).map(|_| analyzer.submit(&file_id, &data_id))).await;
    let job_ids: Vec<String> = submissions
        .into_iter()
        .map(|s| assert_ok!(s).job_id)
        .collect();

    let mut unique = job_ids.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 5);

    let statuses = join_all(job_ids.iter().map(|id| wait_for_terminal(&analyzer, id))).await;
    assert!(statuses.iter().all(|s| *s == JobStatus::Completed));
    assert_eq!(calls.load(Ordering::SeqCst), 5);

    for id in &job_ids {
        let results = assert_ok!(analyzer.results(id).await);
        assert_eq!(results.results.findings.total_issues, 2);
        assert_eq!(assert_ok!(analyzer.logs(id).await).job_id, *id);
    }
}

#[tokio::test]
async fn test_unknown_job_is_not_found_everywhere() {
    let analyzer = analyzer(CannedModel::new(JANE_DOE_ANSWER));
    let job_id = Uuid::new_v4().to_string();

    assert!(assert_err!(analyzer.status(&job_id).await).is_not_found());
    assert!(assert_err!(analyzer.results(&job_id).await).is_not_found());
    assert!(assert_err!(analyzer.logs(&job_id).await).is_not_found());
    assert!(assert_err!(analyzer.logs("not-a-uuid").await).is_not_found());
}

#[tokio::test]
async fn test_empty_model_answer_is_llm_error() {
    let analyzer = analyzer(CannedModel::new(""));
    let (file_id, data_id) = upload_inputs(&analyzer).await;
    let job_id = assert_ok!(analyzer.submit(&file_id, &data_id).await).job_id;

    assert_eq!(wait_for_terminal(&analyzer, &job_id).await, JobStatus::Error);

    let status = assert_ok!(analyzer.status(&job_id).await);
    let expected = LlmError::EmptyContent {
        model: "fake-vision".to_string(),
    }
    .to_string();
    assert_eq!(status.message, format!("Analysis failed: {}", expected));
}

#[tokio::test]
async fn test_batch_app_runs_all_images() {
    logger::init();
    let root = temp_root();
    assert_ok!(tokio::fs::create_dir_all(&root).await);

    let contest_file = root.join("contests.txt");
    assert_ok!(tokio::fs::write(&contest_file, CONTESTS).await);

    let mut image_paths = Vec::new();
    for name in ["a.png", "b.png"] {
        let path = root.join(name);
        assert_ok!(tokio::fs::write(&path, PNG_BYTES).await);
        image_paths.push(path.display().to_string());
    }
    // 不存在的图片在上传阶段失败
    image_paths.push(root.join("missing.png").display().to_string());

    let config = Config {
        contest_file: contest_file.display().to_string(),
        image_paths,
        ..test_config(&root)
    };
    let analyzer = BallotAnalyzer::new(config.clone(), CannedModel::new(JANE_DOE_ANSWER));

    let stats = assert_ok!(App::with_analyzer(config, analyzer).run().await);

    assert_eq!(stats.total, 3);
    assert_eq!(stats.completed, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.total_issues, 2);
}
