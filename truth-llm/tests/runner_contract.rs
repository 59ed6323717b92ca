// truth-llm/tests/runner_contract.rs
// Integration coverage for the end-to-end LLM runner contract (§4.2) and
// its circuit-breaker integration (§4.7).

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use time::OffsetDateTime;
use truth_core::AgentRun;
use truth_core::AgentRunId;
use truth_core::AgentRunRepository;
use truth_core::JobId;
use truth_core::RepoError;
use truth_core::RepoResult;
use truth_core::RunId;
use truth_llm::AcceptAllValidator;
use truth_llm::AgentType;
use truth_llm::CircuitBreakerRecord;
use truth_llm::CircuitBreakerStore;
use truth_llm::CircuitBreakerStoreError;
use truth_llm::ChatResponse;
use truth_llm::ChatResponseMessage;
use truth_llm::LlmRunner;
use truth_llm::LlmTransport;
use truth_llm::NoopSleeper;
use truth_llm::PromptRegistry;
use truth_llm::RunRequest;
use truth_llm::TransportError;

#[derive(Default)]
struct InMemoryAgentRunRepo {
    rows: Mutex<HashMap<String, AgentRun>>,
}

impl AgentRunRepository for InMemoryAgentRunRepo {
    fn put(&self, run: AgentRun) -> RepoResult<AgentRun> {
        let mut rows = self.rows.lock().expect("lock");
        rows.insert(run.id.as_str().to_owned(), run.clone());
        Ok(run)
    }

    fn get(&self, id: &AgentRunId) -> RepoResult<AgentRun> {
        self.rows
            .lock()
            .expect("lock")
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| RepoError::NotFound(id.to_string()))
    }

    fn mean_confidence_since(&self, _agent_type: &str, _since: OffsetDateTime) -> RepoResult<Option<f64>> {
        Ok(None)
    }
}

#[derive(Default)]
struct InMemoryCircuitStore {
    rows: Mutex<HashMap<String, (CircuitBreakerRecord, OffsetDateTime)>>,
}

impl CircuitBreakerStore for InMemoryCircuitStore {
    fn load(&self, provider_id: &str) -> Result<Option<(CircuitBreakerRecord, OffsetDateTime)>, CircuitBreakerStoreError> {
        Ok(self.rows.lock().expect("lock").get(provider_id).cloned())
    }

    fn save(&self, record: &CircuitBreakerRecord, now: OffsetDateTime) -> Result<(), CircuitBreakerStoreError> {
        self.rows.lock().expect("lock").insert(record.provider_id.clone(), (record.clone(), now));
        Ok(())
    }
}

/// Transport that always returns the same scripted response.
struct ScriptedTransport {
    responses: Mutex<Vec<Result<ChatResponse, TransportError>>>,
}

impl ScriptedTransport {
    fn new(responses: Vec<Result<ChatResponse, TransportError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
        }
    }
}

impl LlmTransport for ScriptedTransport {
    fn chat(&self, _request: &truth_llm::ChatRequest) -> Result<ChatResponse, TransportError> {
        let mut responses = self.responses.lock().expect("lock");
        if responses.is_empty() {
            Err(TransportError::Unknown("no more scripted responses".to_owned()))
        } else {
            responses.remove(0)
        }
    }

    fn health(&self, _endpoint: &str, _api_key: Option<&str>) -> Result<truth_llm::HealthStatus, TransportError> {
        Ok(truth_llm::HealthStatus::Ok)
    }
}

fn success_response(body: serde_json::Value) -> ChatResponse {
    ChatResponse {
        message: ChatResponseMessage {
            content: Some(body.to_string()),
            thinking: None,
        },
        eval_count: Some(128),
    }
}

fn build_runner(transport: ScriptedTransport) -> (LlmRunner, Arc<InMemoryAgentRunRepo>, Arc<InMemoryCircuitStore>) {
    let agent_run_repo = Arc::new(InMemoryAgentRunRepo::default());
    let circuit_store = Arc::new(InMemoryCircuitStore::default());
    let runner = LlmRunner::new(
        Arc::new(transport),
        agent_run_repo.clone(),
        circuit_store.clone(),
        PromptRegistry::with_default_prompts(),
        Arc::new(NoopSleeper::default()),
    );
    (runner, agent_run_repo, circuit_store)
}

fn base_request<'a>(input_validator: &'a AcceptAllValidator, output_validator: &'a AcceptAllValidator) -> RunRequest<'a> {
    RunRequest {
        agent_type: AgentType::Extractor,
        input: serde_json::json!({"evidence_id": "e1", "content": "text"}),
        input_validator,
        output_validator,
        temperature: 0.1,
        max_retries: 3,
        run_id: RunId::new("run-1"),
        job_id: JobId::new("job-1"),
        queue_name: "extract".to_owned(),
        provider_id: "ollama".to_owned(),
    }
}

#[test]
fn successful_call_records_a_completed_agent_run() {
    let transport = ScriptedTransport::new(vec![Ok(success_response(serde_json::json!({"extractions": []})))]);
    let (runner, agent_run_repo, _circuit_store) = build_runner(transport);
    let input_validator = AcceptAllValidator;
    let output_validator = AcceptAllValidator;
    let request = base_request(&input_validator, &output_validator);

    let outcome = runner.run(&request, "https://ollama.com", None, "llama3.1").expect("run succeeds");
    assert!(outcome.success);
    assert_eq!(outcome.tokens_used, Some(128));

    let recorded = agent_run_repo.get(&outcome.run_id).expect("row recorded");
    assert_eq!(recorded.status, truth_core::AgentRunStatus::Completed);
}

#[test]
fn transient_failures_retry_and_eventually_succeed() {
    let transport = ScriptedTransport::new(vec![
        Err(TransportError::Timeout),
        Err(TransportError::Network("connection reset".to_owned())),
        Ok(success_response(serde_json::json!({"extractions": []}))),
    ]);
    let (runner, _repo, _circuit_store) = build_runner(transport);
    let input_validator = AcceptAllValidator;
    let output_validator = AcceptAllValidator;
    let request = base_request(&input_validator, &output_validator);

    let outcome = runner.run(&request, "https://ollama.com", None, "llama3.1").expect("run succeeds");
    assert!(outcome.success);
}

#[test]
fn exhausting_retries_records_a_failed_agent_run() {
    let transport = ScriptedTransport::new(vec![
        Err(TransportError::Timeout),
        Err(TransportError::Timeout),
        Err(TransportError::Timeout),
    ]);
    let (runner, agent_run_repo, _circuit_store) = build_runner(transport);
    let input_validator = AcceptAllValidator;
    let output_validator = AcceptAllValidator;
    let request = base_request(&input_validator, &output_validator);

    let outcome = runner.run(&request, "https://ollama.com", None, "llama3.1").expect("run returns a failure outcome");
    assert!(!outcome.success);
    let recorded = agent_run_repo.get(&outcome.run_id).expect("row recorded");
    assert_eq!(recorded.status, truth_core::AgentRunStatus::Failed);
}

#[test]
fn open_circuit_fails_fast_without_calling_the_transport() {
    let transport = ScriptedTransport::new(vec![]);
    let (runner, _repo, circuit_store) = build_runner(transport);

    let mut record = CircuitBreakerRecord::closed("ollama");
    let now = OffsetDateTime::now_utc();
    for i in 0..5i64 {
        record = record.record_failure(now + time::Duration::seconds(i), "boom");
    }
    circuit_store.save(&record, OffsetDateTime::now_utc()).expect("save succeeds");

    let input_validator = AcceptAllValidator;
    let output_validator = AcceptAllValidator;
    let request = base_request(&input_validator, &output_validator);

    let result = runner.run(&request, "https://ollama.com", None, "llama3.1");
    assert!(matches!(result, Err(truth_llm::RunnerError::CircuitOpen(_))));
}

#[test]
fn json_in_thinking_field_is_recovered() {
    let response = ChatResponse {
        message: ChatResponseMessage {
            content: Some(String::new()),
            thinking: Some(r#"Let me think... {"extractions": [{"domain": "taxation"}]}"#.to_owned()),
        },
        eval_count: None,
    };
    let transport = ScriptedTransport::new(vec![Ok(response)]);
    let (runner, _repo, _circuit_store) = build_runner(transport);
    let input_validator = AcceptAllValidator;
    let output_validator = AcceptAllValidator;
    let request = base_request(&input_validator, &output_validator);

    let outcome = runner.run(&request, "https://ollama.com", None, "llama3.1").expect("run succeeds");
    assert!(outcome.success);
    assert_eq!(outcome.output.expect("output present")["extractions"][0]["domain"], "taxation");
}
