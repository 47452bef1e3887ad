use crate::classify::{handle_response, Classification};
use crate::fixtures::Fixtures;
use crate::performance::SharedMetrics;
use rand::Rng;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Pet type ids the PetClinic seed data defines.
pub const PET_TYPE_IDS: std::ops::RangeInclusive<u32> = 1..=6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ApiGroup {
    PetTypes,
    Owners,
    Pets,
    Visits,
    Vets,
    Specialties,
}

impl ApiGroup {
    pub fn name(&self) -> &'static str {
        match self {
            ApiGroup::PetTypes => "Pettypes API",
            ApiGroup::Owners => "Owner API",
            ApiGroup::Pets => "Pet API",
            ApiGroup::Visits => "Visit API",
            ApiGroup::Vets => "Vet API",
            ApiGroup::Specialties => "Specialty API",
        }
    }
}

/// The random choices one iteration is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationPicks {
    pub owner_id: u32,
    pub pet_id: u32,
    pub vet_id: u32,
    pub specialty_id: u32,
    pub visit_id: u32,
    pub pet_type_id: u32,
    pub telephone_digit: u8,
}

impl IterationPicks {
    pub fn random<R: Rng + ?Sized>(fixtures: &Fixtures, rng: &mut R) -> Self {
        Self {
            owner_id: fixtures.random_owner(rng).id,
            pet_id: fixtures.random_pet(rng).id,
            vet_id: fixtures.random_vet(rng).id,
            specialty_id: fixtures.random_specialty(rng).id,
            visit_id: fixtures.random_visit(rng).id,
            pet_type_id: rng.gen_range(PET_TYPE_IDS),
            telephone_digit: rng.gen_range(0..10),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRequest {
    pub group: ApiGroup,
    pub method: Method,
    pub path: String,
    pub body: Option<String>,
    pub json_content_type: bool,
}

impl PlannedRequest {
    fn get(group: ApiGroup, path: String, json_content_type: bool) -> Self {
        Self {
            group,
            method: Method::GET,
            path,
            body: None,
            json_content_type,
        }
    }

    fn with_body(group: ApiGroup, method: Method, path: String, body: serde_json::Value) -> Self {
        Self {
            group,
            method,
            path,
            body: Some(body.to_string()),
            json_content_type: true,
        }
    }
}

/// Build the ordered request sequence of one iteration.
pub fn plan_iteration(picks: &IterationPicks) -> Vec<PlannedRequest> {
    let IterationPicks {
        owner_id,
        pet_id,
        vet_id,
        specialty_id,
        visit_id,
        pet_type_id,
        telephone_digit,
    } = *picks;

    let owner_body = json!({
        "firstName": "George",
        "lastName": "Franklin",
        "address": "110 W. Liberty St.",
        "city": "Madison",
        "telephone": format!("608555102{}", telephone_digit),
    });
    let pet_body = json!({
        "name": "Leo",
        "birthDate": "2024-11-08",
        "type": { "name": "cat", "id": 1 },
    });
    let visit_body = json!({
        "date": "2024-11-08",
        "description": "rabies shot",
    });
    let vet_body = json!({
        "firstName": "James",
        "lastName": "Carter",
        "specialties": [{ "name": "radiology" }],
    });
    let specialty_body = json!({ "name": "surgery" });

    let owner_path = format!("/api/owners/{}", owner_id);
    let pet_path = format!("/api/pets/{}", pet_id);
    let visit_path = format!("/api/visits/{}", visit_id);
    let vet_path = format!("/api/vets/{}", vet_id);
    let specialty_path = format!("/api/specialties/{}", specialty_id);

    vec![
        PlannedRequest::get(
            ApiGroup::PetTypes,
            format!("/api/pettypes/{}", pet_type_id),
            false,
        ),
        PlannedRequest::get(ApiGroup::Owners, owner_path.clone(), false),
        PlannedRequest::with_body(ApiGroup::Owners, Method::PUT, owner_path, owner_body),
        PlannedRequest::get(ApiGroup::Pets, pet_path.clone(), true),
        PlannedRequest::with_body(ApiGroup::Pets, Method::PUT, pet_path, pet_body),
        PlannedRequest::with_body(
            ApiGroup::Visits,
            Method::POST,
            format!("/api/owners/{}/pets/{}/visits", owner_id, pet_id),
            visit_body.clone(),
        ),
        PlannedRequest::get(ApiGroup::Visits, visit_path.clone(), true),
        PlannedRequest::with_body(ApiGroup::Visits, Method::PUT, visit_path, visit_body),
        PlannedRequest::get(ApiGroup::Vets, vet_path.clone(), true),
        PlannedRequest::with_body(ApiGroup::Vets, Method::PUT, vet_path, vet_body),
        PlannedRequest::get(ApiGroup::Specialties, specialty_path.clone(), false),
        PlannedRequest::with_body(
            ApiGroup::Specialties,
            Method::PUT,
            specialty_path,
            specialty_body,
        ),
    ]
}

#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub group: ApiGroup,
    pub method: Method,
    pub url: String,
    /// `None` when no response arrived (timeout, refused connection, ...).
    pub status: Option<u16>,
    pub duration: Duration,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub error: Option<String>,
    pub classification: Classification,
}

impl RequestRecord {
    pub fn is_failed(&self) -> bool {
        self.status.map_or(true, |status| status >= 400)
    }
}

#[derive(Debug, Clone)]
pub struct IterationReport {
    pub requests: Vec<RequestRecord>,
    pub duration: Duration,
}

/// Runs iterations against one PetClinic deployment. Cheap to share behind an `Arc`.
pub struct IterationDriver {
    client: Client,
    base_url: String,
    fixtures: Arc<Fixtures>,
}

impl IterationDriver {
    pub fn new(client: Client, base_url: &str, fixtures: Arc<Fixtures>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            fixtures,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run one iteration with fresh random picks. Each response is folded into
    /// `metrics` as it arrives, so an iteration aborted halfway still counts
    /// the requests it completed.
    pub async fn run_iteration(&self, metrics: &SharedMetrics) -> IterationReport {
        // thread_rng is not Send, so it must be gone before the first await
        let picks = {
            let mut rng = rand::thread_rng();
            IterationPicks::random(&self.fixtures, &mut rng)
        };
        self.run_with_picks(picks, metrics).await
    }

    pub async fn run_with_picks(
        &self,
        picks: IterationPicks,
        metrics: &SharedMetrics,
    ) -> IterationReport {
        let started = Instant::now();
        let mut requests = Vec::new();

        for planned in plan_iteration(&picks) {
            let record = self.send(planned).await;
            metrics.lock().await.record_response(&record);
            requests.push(record);
        }

        IterationReport {
            requests,
            duration: started.elapsed(),
        }
    }

    async fn send(&self, planned: PlannedRequest) -> RequestRecord {
        let url = format!("{}{}", self.base_url, planned.path);
        let bytes_sent = planned.body.as_ref().map_or(0, |b| b.len() as u64);

        let mut builder = self.client.request(planned.method.clone(), &url);
        if planned.json_content_type {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        if let Some(body) = planned.body {
            builder = builder.body(body);
        }

        let start = Instant::now();
        let (status, bytes_received, error) = match builder.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                // bodies are discarded, only their size is kept
                match response.bytes().await {
                    Ok(bytes) => (Some(status), bytes.len() as u64, None),
                    Err(e) => (
                        Some(status),
                        0,
                        Some(format!("Failed to read response body: {}", e)),
                    ),
                }
            }
            Err(e) => (None, 0, Some(e.to_string())),
        };
        let duration = start.elapsed();

        if let Some(err) = &error {
            tracing::debug!(method = %planned.method, url = %url, "request error: {}", err);
        }

        // no response is classified as status 0; record_response counts it as a connection error
        let classification = handle_response(&planned.method, &url, status.unwrap_or(0));

        RequestRecord {
            group: planned.group,
            method: planned.method,
            url,
            status,
            duration,
            bytes_sent,
            bytes_received,
            error,
            classification,
        }
    }
}
