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

//! API resource for reading the current counter value.

use crate::rest_api::AppState;
use actix_web::HttpResponse;
use actix_web::get;
use actix_web::http::header::ContentType;
use actix_web::web::Data;

/// Return the current counter value.
#[utoipa::path(
    tag = "counter",
    responses(
        (
            status = 200,
            description = "The current counter value as a decimal integer.",
            content_type = "text/plain",
            body = String,
        ),
    ),
)]
#[get("/latest")]
pub async fn latest_counter(app_state: Data<AppState>) -> HttpResponse {
    let value = app_state.counter.read_current();
    HttpResponse::Ok()
        .content_type(ContentType::plaintext())
        .body(value.to_string())
}
