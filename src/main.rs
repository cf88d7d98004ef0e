use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use hie_hl7::{AdtCodec, AdtMessage};
use hie_types::{HEALTH_ID_OID, NATIONAL_ORG_ROOT, scheme};
use hie_xds::{
    SubmissionRequest, TransportArtifact, XdsCodec, XdsError, build_soap_fault, select_transport,
};

/// Application state shared across REST API handlers
///
/// Holds the two codec facades. Both carry their advisory capability
/// (conformance check, schema validation) selected here, once, at process
/// construction; per-request calls never re-probe for capabilities.
#[derive(Clone)]
struct AppState {
    hl7: Arc<AdtCodec>,
    xds: Arc<XdsCodec>,
}

#[derive(OpenApi)]
#[openapi(
    paths(health, json_to_hl7, hl7_to_json, json_to_iti41, iti41_to_json, example),
    components(schemas(
        HealthRes,
        Hl7ConvertRes,
        Hl7DecodeReq,
        Iti41DecodeReq,
        ErrorBody,
        AdtMessage,
        hie_hl7::MessageHeader,
        hie_hl7::PatientDemographics,
        hie_hl7::AdditionalDemographics,
        hie_hl7::Visit,
        hie_hl7::MergeRecord,
        hie_hl7::Allergy,
        hie_hl7::Diagnosis,
        hie_hl7::Procedure,
        hie_hl7::NextOfKin,
        hie_hl7::Guarantor,
        hie_hl7::InsuranceCoverage,
        hie_types::Identifier,
        SubmissionRequest,
        hie_xds::SoapAddressing,
    ))
)]
struct ApiDoc;

/// Health check response body
#[derive(Serialize, ToSchema)]
struct HealthRes {
    ok: bool,
    message: String,
}

/// Successful HL7 encode response body
#[derive(Serialize, ToSchema)]
struct Hl7ConvertRes {
    hl7: String,
}

/// HL7 decode request body
#[derive(Deserialize, ToSchema)]
struct Hl7DecodeReq {
    hl7: Option<String>,
}

/// ITI-41 decode request body
#[derive(Deserialize, ToSchema)]
struct Iti41DecodeReq {
    xml: Option<String>,
}

/// Error response body carrying the validator/codec message verbatim
#[derive(Serialize, ToSchema)]
struct ErrorBody {
    detail: String,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn bad_request(detail: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            detail: detail.into(),
        }),
    )
}

/// Main entry point for the HIE mapper service
///
/// Starts the REST server (default port 3000, configurable via HIE_ADDR)
/// exposing the JSON ⇄ HL7 and JSON ⇄ ITI-41 conversion endpoints.
///
/// # Environment Variables
/// - `HIE_ADDR`: REST server address (default: "0.0.0.0:3000")
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If server startup or runtime fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("hie=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("HIE_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    tracing::info!("++ Starting HIE mapper REST on {}", addr);

    let state = AppState {
        hl7: Arc::new(AdtCodec::new()),
        xds: Arc::new(XdsCodec::new()),
    };

    let app = Router::new()
        .route("/health", get(health))
        .route("/convert/json-to-hl7", post(json_to_hl7))
        .route("/convert/hl7-to-json", post(hl7_to_json))
        .route("/convert/json-to-iti41", post(json_to_iti41))
        .route("/convert/iti41-to-json", post(iti41_to_json))
        .route("/example", get(example))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "HIE mapper is alive".into(),
    })
}

#[utoipa::path(
    post,
    path = "/convert/json-to-hl7",
    request_body = AdtMessage,
    responses(
        (status = 200, description = "Encoded HL7 message", body = Hl7ConvertRes),
        (status = 400, description = "Semantic encode error", body = ErrorBody)
    )
)]
/// Encode an ADT JSON payload to an HL7 v2.5.1 message
async fn json_to_hl7(
    State(state): State<AppState>,
    Json(message): Json<AdtMessage>,
) -> Result<Json<Hl7ConvertRes>, ApiError> {
    tracing::info!("received JSON to HL7 conversion request");
    match state.hl7.encode(&message) {
        Ok(hl7) => {
            tracing::info!("HL7 conversion success");
            Ok(Json(Hl7ConvertRes { hl7 }))
        }
        Err(e) => {
            tracing::error!("HL7 conversion failed: {e}");
            Err(bad_request(e.to_string()))
        }
    }
}

#[utoipa::path(
    post,
    path = "/convert/hl7-to-json",
    request_body = Hl7DecodeReq,
    responses(
        (status = 200, description = "Decoded partial JSON model"),
        (status = 400, description = "Missing 'hl7' field", body = ErrorBody)
    )
)]
/// Decode an HL7 message to the partial JSON model
async fn hl7_to_json(
    State(state): State<AppState>,
    Json(request): Json<Hl7DecodeReq>,
) -> Result<Json<serde_json::Value>, ApiError> {
    tracing::info!("received HL7 to JSON conversion request");
    let Some(hl7) = request.hl7.filter(|t| !t.is_empty()) else {
        tracing::error!("HL7 to JSON conversion failed: missing 'hl7' field");
        return Err(bad_request("Provide 'hl7' field"));
    };
    let decoded = state.hl7.decode(&hl7);
    tracing::info!("HL7 to JSON conversion success");
    Ok(Json(serde_json::json!({ "json": decoded })))
}

#[utoipa::path(
    post,
    path = "/convert/json-to-iti41",
    request_body = SubmissionRequest,
    responses(
        (status = 200, description = "ITI-41 envelope (application/xml) or MTOM package (multipart/related)"),
        (status = 400, description = "Input-shape error", body = ErrorBody),
        (status = 500, description = "Encode failure rendered as a SOAP fault")
    )
)]
/// Encode a submission to an ITI-41 envelope, switching to MTOM when the
/// document crosses the attachment threshold
async fn json_to_iti41(
    State(state): State<AppState>,
    Json(mut request): Json<SubmissionRequest>,
) -> Result<Response, ApiError> {
    tracing::info!("received JSON to ITI-41 conversion request");
    if let Err(e) = request.validate() {
        tracing::error!("ITI-41 conversion failed: {e}");
        return Err(bad_request(e.to_string()));
    }

    match state.xds.encode(&request) {
        Ok(xml) => {
            let artifact = select_transport(xml, &request);
            let label = match &artifact {
                TransportArtifact::Inline(_) if request.document_base64.is_none() => "no document",
                TransportArtifact::Inline(_) => "inline document",
                TransportArtifact::Multipart(_) => "MTOM multipart",
            };
            tracing::info!("ITI-41 build success ({label})");
            let content_type = artifact.content_type().to_owned();
            Ok((
                StatusCode::OK,
                [(header::CONTENT_TYPE, content_type)],
                artifact.into_body(),
            )
                .into_response())
        }
        Err(e @ XdsError::InvalidInput(_)) => {
            tracing::error!("ITI-41 conversion failed: {e}");
            Err(bad_request(e.to_string()))
        }
        Err(e) => {
            tracing::error!("ITI-41 conversion failed: {e}");
            let fault = build_soap_fault("Receiver", "Processing Failure", Some(&e.to_string()));
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "application/soap+xml".to_owned())],
                fault.into_bytes(),
            )
                .into_response())
        }
    }
}

#[utoipa::path(
    post,
    path = "/convert/iti41-to-json",
    request_body = Iti41DecodeReq,
    responses(
        (status = 200, description = "Flat decoded JSON summary"),
        (status = 400, description = "Missing 'xml' field", body = ErrorBody),
        (status = 500, description = "Unparsable XML", body = ErrorBody)
    )
)]
/// Decode an ITI-41 ebXML document to a flat JSON summary
async fn iti41_to_json(
    State(state): State<AppState>,
    Json(request): Json<Iti41DecodeReq>,
) -> Result<Json<serde_json::Value>, ApiError> {
    tracing::info!("received ITI-41 to JSON conversion request");
    let Some(xml) = request.xml.filter(|t| !t.is_empty()) else {
        tracing::error!("ITI-41 to JSON conversion failed: missing 'xml' field");
        return Err(bad_request("Provide 'xml' field"));
    };
    match state.xds.decode(&xml) {
        Ok(summary) => {
            tracing::info!("ITI-41 to JSON conversion success");
            Ok(Json(serde_json::json!({ "json": summary })))
        }
        Err(e) => {
            tracing::error!("ITI-41 to JSON conversion failed: {e}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    detail: e.to_string(),
                }),
            ))
        }
    }
}

#[utoipa::path(
    get,
    path = "/example",
    responses(
        (status = 200, description = "Sample payloads for both conversion paths")
    )
)]
/// Sample payloads for the HL7 and ITI-41 encode endpoints
async fn example() -> Json<serde_json::Value> {
    let hl7_input = serde_json::json!({
        "header": {
            "event": "ADT^A01",
            "sending_app_oid": format!("{NATIONAL_ORG_ROOT}.example.ehr"),
            "sending_facility": "HospitalA",
            "message_datetime": "2025-10-21T12:30:00Z",
            "message_control_id": "MSG0001",
        },
        "patient": {
            "identifiers": [
                {"id": "NHIC123456", "assigning_authority": HEALTH_ID_OID}
            ],
            "name_family": "Doe",
            "name_given": "John",
            "dob": "19800101",
            "sex": "M",
        },
    });
    let iti41_input = serde_json::json!({
        "soap": {
            "action": scheme::DEFAULT_ACTION,
            "message_id": Uuid::new_v4().to_string(),
            "to": "https://hie.example/iti41",
        },
        "repository_address": "https://repo.example",
        "patient_id": format!("NHIC123456^^^&{HEALTH_ID_OID}&ISO"),
        "class_code": "REPORTS",
        "type_code": "11369-6",
        "unique_id": "urn:uuid:doc-1",
        "document_base64": "ZG9jdW1lbnRjb250ZW50",
        "mime_type": "text/xml",
        "creation_time": "20251021T123000Z",
        "source_id": format!("{NATIONAL_ORG_ROOT}.12345"),
        "repository_unique_id": format!("{NATIONAL_ORG_ROOT}.repo.1"),
    });
    Json(serde_json::json!({
        "hl7_input_example": hl7_input,
        "iti41_input_example": iti41_input,
    }))
}
