use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{debug, instrument};

use crate::cache::SIGHTLINE_STATUS_HEADER;
use crate::gateway::error::GatewayError;
use crate::gateway::state::HandlerState;
use crate::model::{IdentifyRequest, UserLocation};
use crate::pipeline::Identification;

/// Raw multipart fields of an identify request.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IdentifyForm {
    pub image: Option<Vec<u8>>,
    pub image_id: Option<String>,
    pub user_lat: Option<String>,
    pub user_lng: Option<String>,
}

#[instrument(skip_all)]
pub async fn identify_handler(
    State(state): State<HandlerState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, GatewayError> {
    let multipart = multipart.map_err(|e| GatewayError::InvalidRequest(e.body_text()))?;
    let form = read_form(multipart, state.max_image_bytes).await?;

    let now = state.pipeline.cache().now().timestamp();
    let request = build_request(form, now)?;
    debug!(image_id = %request.image_id, bytes = request.image.len(), "identify request parsed");

    let identification = state.pipeline.identify(request).await?;
    Ok(make_response(identification))
}

pub(crate) async fn read_form(
    mut multipart: Multipart,
    max_image_bytes: usize,
) -> Result<IdentifyForm, GatewayError> {
    let mut form = IdentifyForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_image_bytes))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        match name.as_str() {
            "image" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error(e, max_image_bytes))?;
                if bytes.len() > max_image_bytes {
                    return Err(GatewayError::PayloadTooLarge {
                        limit: max_image_bytes,
                    });
                }
                form.image = Some(bytes.to_vec());
            }
            "image_id" | "user_lat" | "user_lng" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| multipart_error(e, max_image_bytes))?;
                match name.as_str() {
                    "image_id" => form.image_id = Some(text),
                    "user_lat" => form.user_lat = Some(text),
                    _ => form.user_lng = Some(text),
                }
            }
            other => debug!(field = other, "ignoring unknown multipart field"),
        }
    }

    Ok(form)
}

fn multipart_error(e: MultipartError, max_image_bytes: usize) -> GatewayError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        GatewayError::PayloadTooLarge {
            limit: max_image_bytes,
        }
    } else {
        GatewayError::InvalidRequest(e.body_text())
    }
}

/// Validates form fields into a pipeline request. `now` (Unix seconds) names id-less uploads.
pub(crate) fn build_request(form: IdentifyForm, now: i64) -> Result<IdentifyRequest, GatewayError> {
    let image = form
        .image
        .filter(|bytes| !bytes.is_empty())
        .ok_or_else(|| GatewayError::InvalidRequest("missing or empty `image` field".to_string()))?;

    let image_id = form
        .image_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| format!("img_{now}"));

    let lat = parse_coordinate("user_lat", form.user_lat.as_deref())?;
    let lng = parse_coordinate("user_lng", form.user_lng.as_deref())?;

    let mut request = IdentifyRequest::new(image_id, image);
    if let (Some(lat), Some(lng)) = (lat, lng) {
        let location = UserLocation::new(lat, lng).ok_or_else(|| {
            GatewayError::InvalidRequest(format!("user location out of range: {lat}, {lng}"))
        })?;
        request = request.with_location(location);
    }
    Ok(request)
}

/// Blank or absent values are `None`; anything else must parse as a finite number.
fn parse_coordinate(field: &str, raw: Option<&str>) -> Result<Option<f64>, GatewayError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(GatewayError::InvalidRequest(format!(
            "`{field}` is not a number: {raw}"
        ))),
    }
}

pub(crate) fn make_response(identification: Identification) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        SIGHTLINE_STATUS_HEADER,
        HeaderValue::from_static(identification.status.as_header_value()),
    );
    (StatusCode::OK, headers, Json(identification.envelope)).into_response()
}
