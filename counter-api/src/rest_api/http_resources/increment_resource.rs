/*
    Copyright 2025 MydriaTech AB

    Licensed under the Apache License 2.0 with Free world makers exception
    1.0.0 (the "License"); you may not use this file except in compliance with
    the License. You should have obtained a copy of the License with the source
    or binary distribution in file named

        LICENSE-Apache-2.0-with-FWM-Exception-1.0.0

    Unless required by applicable law or agreed to in writing, software
    distributed under the License is distributed on an "AS IS" BASIS,
    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
    See the License for the specific language governing permissions and
    limitations under the License.
*/

//! API resource for incrementing the counter.

use crate::rest_api::AppState;
use crate::rest_api::common::ApiErrorMapper;
use actix_web::Error;
use actix_web::HttpResponse;
use actix_web::get;
use actix_web::http::header::ContentType;
use actix_web::web;
use actix_web::web::Data;
use std::sync::Arc;

/// Increment the counter and return the new value.
///
/// The path is kept for compatibility with existing clients.
#[utoipa::path(
    tag = "counter",
    responses(
        (
            status = 200,
            description = "The incremented counter value as a decimal integer.",
            content_type = "text/plain",
            body = String,
        ),
        (
            status = 503,
            description = "The new value could not be persisted and the counter is unchanged.",
        ),
        (status = 500, description = "Internal server error."),
    ),
)]
#[get("/hostname")]
pub async fn increment_counter(app_state: Data<AppState>) -> Result<HttpResponse, Error> {
    let counter = Arc::clone(&app_state.counter);
    // File I/O runs on the blocking thread pool to keep the workers responsive.
    let value = web::block(move || counter.increment_and_persist())
        .await?
        .map_err(ApiErrorMapper::from_counter_error)?;
    Ok(HttpResponse::Ok()
        .content_type(ContentType::plaintext())
        .body(value.to_string()))
}
