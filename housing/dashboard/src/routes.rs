use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Form, Json, Router,
};
use housing_pricing::{format_currency, EvaluationReport, HouseFeatures};
use serde_json::{json, Value};

use crate::{
    error::DashboardError,
    render::{self, Estimate, PageView},
    session::{Session, SessionCache},
};

/// Router state: the shared lazy session.
pub type SharedCache = Arc<SessionCache>;

/// Builds the dashboard router.
pub fn router(cache: SharedCache) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/predict", post(predict_form))
        .route("/api/summary", get(summary))
        .route("/api/metrics", get(metrics))
        .route("/api/predict", post(predict_json))
        .route("/health", get(health))
        .with_state(cache)
}

fn render_page(
    session: &Session,
    report: &EvaluationReport,
    house: &HouseFeatures,
    estimate: Option<&Estimate>,
) -> Html<String> {
    Html(render::page(&PageView {
        summary: session.summary(),
        histogram: session.histogram(),
        report,
        house,
        estimate,
        currency: &session.config().dashboard.currency_symbol,
    }))
}

async fn index(State(cache): State<SharedCache>) -> Result<Html<String>, DashboardError> {
    let session = cache.load().await?;
    let report = session.metrics()?;
    Ok(render_page(&session, &report, &HouseFeatures::default(), None))
}

async fn predict_form(
    State(cache): State<SharedCache>,
    Form(house): Form<HouseFeatures>,
) -> Result<(StatusCode, Html<String>), DashboardError> {
    let session = cache.load().await?;
    let report = session.metrics()?;
    let (status, estimate) = match session.predict(&house) {
        Ok(price) => (StatusCode::OK, Estimate::Price(price)),
        Err(DashboardError::Input(err)) => {
            (StatusCode::UNPROCESSABLE_ENTITY, Estimate::Rejected(err.to_string()))
        }
        Err(other) => return Err(other),
    };
    Ok((status, render_page(&session, &report, &house, Some(&estimate))))
}

async fn summary(State(cache): State<SharedCache>) -> Result<Json<Value>, DashboardError> {
    let session = cache.load().await?;
    Ok(Json(json!({
        "summary": session.summary(),
        "histogram": session.histogram(),
    })))
}

async fn metrics(
    State(cache): State<SharedCache>,
) -> Result<Json<EvaluationReport>, DashboardError> {
    let session = cache.load().await?;
    Ok(Json(session.metrics()?))
}

async fn predict_json(
    State(cache): State<SharedCache>,
    Json(house): Json<HouseFeatures>,
) -> Result<Json<Value>, DashboardError> {
    let session = cache.load().await?;
    let price = session.predict(&house)?;
    Ok(Json(json!({
        "price": price,
        "display": format_currency(&session.config().dashboard.currency_symbol, price),
        "input": house,
    })))
}

async fn health(State(cache): State<SharedCache>) -> Json<Value> {
    Json(json!({ "status": "ok", "model_loaded": cache.is_loaded() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request},
    };
    use housing_pricing::{PricingConfig, TrainingPipeline};
    use std::path::Path;
    use tempfile::{tempdir, TempDir};
    use tower::ServiceExt;

    fn trained_cache() -> (TempDir, SharedCache) {
        let dir = tempdir().unwrap();
        let mut config = PricingConfig::default();
        config.paths.dataset =
            Path::new(env!("CARGO_MANIFEST_DIR")).join("../pricing/dataset/Housing.csv");
        config.paths.artifact = dir.path().join("model.json");
        TrainingPipeline::new(&config).run().unwrap();
        (dir, Arc::new(SessionCache::new(config, None)))
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn index_renders_and_loads_lazily() {
        let (_dir, cache) = trained_cache();
        assert!(!cache.is_loaded());
        let response = router(cache.clone())
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_string(response).await;
        assert!(html.contains("House Price Prediction"));
        assert!(html.contains("<svg"));
        assert!(cache.is_loaded());
        let first = cache.get().unwrap();
        let response = router(cache.clone())
            .oneshot(Request::get("/api/summary").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(Arc::ptr_eq(&first, &cache.get().unwrap()));
    }

    #[tokio::test]
    async fn default_prediction_matches_direct_predict() {
        let (_dir, cache) = trained_cache();
        let house = HouseFeatures::default();
        let request = Request::post("/api/predict")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&house).unwrap()))
            .unwrap();
        let response = router(cache.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let value: Value = serde_json::from_str(&body_string(response).await).unwrap();
        let served = value["price"].as_f64().unwrap();
        let session = cache.get().unwrap();
        let direct = session
            .artifact()
            .predict(&house.to_table())
            .unwrap()[0];
        assert!(served.is_finite());
        assert!((served - direct).abs() <= 1e-6 * direct.abs().max(1.0));
        assert!(value["display"].as_str().unwrap().starts_with('₹'));
    }

    #[tokio::test]
    async fn out_of_range_json_input_is_unprocessable() {
        let (_dir, cache) = trained_cache();
        let house = HouseFeatures {
            area: 20_000,
            ..HouseFeatures::default()
        };
        let request = Request::post("/api/predict")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&house).unwrap()))
            .unwrap();
        let response = router(cache).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_string(response).await.contains("area"));
    }

    #[tokio::test]
    async fn form_submission_renders_estimate() {
        let (_dir, cache) = trained_cache();
        let form = "area=4000&bedrooms=3&bathrooms=2&stories=2&parking=1&mainroad=yes\
                    &guestroom=no&basement=no&hotwaterheating=no&airconditioning=yes\
                    &prefarea=no&furnishingstatus=semi-furnished";
        let request = Request::post("/predict")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form))
            .unwrap();
        let response = router(cache).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_string(response).await;
        assert!(html.contains("id=\"price\">₹"));
        assert!(html.contains("value=\"4000\""));
    }

    #[tokio::test]
    async fn off_step_form_input_is_rejected() {
        let (_dir, cache) = trained_cache();
        let form = "area=4050&bedrooms=3&bathrooms=2&stories=2&parking=1&mainroad=yes\
                    &guestroom=no&basement=no&hotwaterheating=no&airconditioning=yes\
                    &prefarea=no&furnishingstatus=furnished";
        let request = Request::post("/predict")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form))
            .unwrap();
        let response = router(cache).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body_string(response).await.contains("id=\"rejected\""));
    }

    #[tokio::test]
    async fn missing_artifact_is_unavailable_but_health_answers() {
        let dir = tempdir().unwrap();
        let mut config = PricingConfig::default();
        config.paths.artifact = dir.path().join("absent.json");
        let cache = Arc::new(SessionCache::new(config, None));
        let app = router(cache);
        let response = app
            .clone()
            .oneshot(Request::get("/api/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("\"model_loaded\":false"));
    }
}
