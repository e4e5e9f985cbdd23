use std::net::SocketAddr;
use std::ops::{ControlFlow, Range};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use contagion::driver::{DEFAULT_SPEED, Driver};
use contagion::render::{Canvas, Palette};
use contagion::{CellChange, CellState, Census, Simulation, SimulationConfig, StepSummary};

/// Engine plus the canvas that mirrors it.
struct Session {
    simulation: Simulation,
    canvas: Canvas,
}

impl Session {
    fn new(config: SimulationConfig, seed: u64) -> contagion::Result<Self> {
        let simulation = Simulation::with_seed(config, seed)?;
        let canvas = Canvas::new(simulation.size(), Palette::default());
        Ok(Self { simulation, canvas })
    }

    /// Swap in `config`, keeping the cells unless the size changed.
    fn reconfigure(&mut self, config: SimulationConfig) -> contagion::Result<()> {
        let resized = config.size != self.simulation.size();
        self.simulation.reconfigure(config)?;
        if resized {
            self.canvas.repaint(self.simulation.grid());
        }
        Ok(())
    }

    fn step(&mut self) -> (StepSummary, Vec<CellChange>) {
        let mut changes = Vec::new();
        let summary = self.simulation.advance(&mut changes);
        for change in &changes {
            self.canvas.paint_cell(change.x, change.y, change.state);
        }
        (summary, changes)
    }
}

/// Animation speed survives pauses; the driver only exists while playing.
struct Animation {
    speed: Duration,
    driver: Option<Driver>,
}

impl Animation {
    fn is_running(&self) -> bool {
        self.driver.as_ref().is_some_and(Driver::is_running)
    }

    /// Stop the driver if there is one and return its tick count.
    async fn halt(&mut self) -> contagion::Result<Option<u64>> {
        match self.driver.take() {
            Some(driver) => Ok(Some(driver.stop().await?)),
            None => Ok(None),
        }
    }
}

#[derive(Clone)]
struct AppState {
    session: Arc<Mutex<Session>>,
    animation: Arc<tokio::sync::Mutex<Animation>>,
}

impl AppState {
    fn new(session: Session) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            animation: Arc::new(tokio::sync::Mutex::new(Animation {
                speed: DEFAULT_SPEED,
                driver: None,
            })),
        }
    }
}

fn lock(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

fn speed_from_millis(ms: u64) -> Duration {
    Duration::from_millis(ms.max(1))
}

/// Step `session` every `speed` until nobody is infected.
fn spawn_driver(session: &Arc<Mutex<Session>>, speed: Duration) -> Driver {
    let session = Arc::clone(session);
    Driver::start(speed, move || {
        let mut session = lock(&session);
        if !session.simulation.is_active() {
            return ControlFlow::Break(());
        }
        session.step();
        ControlFlow::Continue(())
    })
}

#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error(transparent)]
    Simulation(#[from] contagion::Error),

    #[error("pixel ({px}, {py}) is outside the canvas")]
    OutsideCanvas { px: f64, py: f64 },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Simulation(contagion::Error::InvalidConfig { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::OutsideCanvas { .. } => StatusCode::BAD_REQUEST,
            Self::Simulation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });
        (status, Json(body)).into_response()
    }
}

/// Settings update. Absent fields keep their current value.
#[derive(Debug, Deserialize)]
struct SettingsPatch {
    size: Option<usize>,
    probability_to_infect_neighbour: Option<f64>,
    illness_duration: Option<Range<u32>>,
    probability_of_death: Option<f64>,
    speed_ms: Option<u64>,
}

impl SettingsPatch {
    fn merge(&self, current: &SimulationConfig) -> SimulationConfig {
        SimulationConfig {
            size: self.size.unwrap_or(current.size),
            probability_to_infect_neighbour: self
                .probability_to_infect_neighbour
                .unwrap_or(current.probability_to_infect_neighbour),
            illness_duration: self
                .illness_duration
                .clone()
                .unwrap_or_else(|| current.illness_duration.clone()),
            probability_of_death: self.probability_of_death.unwrap_or(current.probability_of_death),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Target {
    Cell { x: i64, y: i64 },
    Pixel { px: f64, py: f64 },
}

#[derive(Deserialize)]
struct ForceRequest {
    x: i64,
    y: i64,
    #[serde(flatten)]
    state: CellState,
}

#[derive(Deserialize)]
struct ToggleParams {
    speed_ms: Option<u64>,
}

#[derive(Serialize)]
struct FrameResponse {
    generation: u64,
    size: usize,
    census: Census,
    data_url: String,
}

#[derive(Serialize)]
struct SettingsResponse {
    config: SimulationConfig,
    speed_ms: u64,
    running: bool,
    #[serde(flatten)]
    frame: FrameResponse,
}

#[derive(Serialize)]
struct StepResponse {
    summary: StepSummary,
    changes: Vec<CellChange>,
}

#[derive(Serialize)]
struct ToggleResponse {
    running: bool,
    speed_ms: u64,
}

fn frame(session: &Session) -> Result<FrameResponse, ApiError> {
    Ok(FrameResponse {
        generation: session.simulation.generation(),
        size: session.simulation.size(),
        census: session.simulation.census(),
        data_url: session.canvas.to_data_url()?,
    })
}

async fn configure_handler(
    State(state): State<AppState>,
    Json(patch): Json<SettingsPatch>,
) -> Result<Json<SettingsResponse>, ApiError> {
    let mut animation = state.animation.lock().await;
    {
        let mut session = lock(&state.session);
        let merged = patch.merge(session.simulation.config());
        session.reconfigure(merged)?;
    }

    let new_speed = patch
        .speed_ms
        .map(speed_from_millis)
        .filter(|speed| *speed != animation.speed);
    if let Some(speed) = new_speed {
        animation.speed = speed;
        if animation.is_running() {
            animation.halt().await?;
            animation.driver = Some(spawn_driver(&state.session, speed));
            info!(speed_ms = speed.as_millis() as u64, "animation speed changed");
        }
    }

    let session = lock(&state.session);
    Ok(Json(SettingsResponse {
        config: session.simulation.config().clone(),
        speed_ms: animation.speed.as_millis() as u64,
        running: animation.is_running(),
        frame: frame(&session)?,
    }))
}

async fn step_handler(State(state): State<AppState>) -> Json<StepResponse> {
    let (summary, changes) = lock(&state.session).step();
    Json(StepResponse { summary, changes })
}

async fn infect_handler(
    State(state): State<AppState>,
    Json(target): Json<Target>,
) -> Result<Json<CellChange>, ApiError> {
    let mut session = lock(&state.session);
    let (x, y) = match target {
        Target::Cell { x, y } => (x, y),
        Target::Pixel { px, py } => {
            let (x, y) = session
                .canvas
                .cell_at(px, py)
                .ok_or(ApiError::OutsideCanvas { px, py })?;
            (x as i64, y as i64)
        }
    };
    let change = session.simulation.force_infect(x, y);
    session.canvas.paint_cell(change.x, change.y, change.state);
    Ok(Json(change))
}

async fn cell_handler(
    State(state): State<AppState>,
    Json(req): Json<ForceRequest>,
) -> Json<CellChange> {
    let mut session = lock(&state.session);
    let change = session.simulation.force_state(req.x, req.y, req.state);
    session.canvas.paint_cell(change.x, change.y, change.state);
    Json(change)
}

async fn reset_handler(State(state): State<AppState>) -> Result<Json<FrameResponse>, ApiError> {
    state.animation.lock().await.halt().await?;
    let mut session = lock(&state.session);
    session.simulation.reset();
    session.canvas.clear();
    Ok(Json(frame(&session)?))
}

async fn toggle_handler(
    State(state): State<AppState>,
    Query(params): Query<ToggleParams>,
) -> Result<Json<ToggleResponse>, ApiError> {
    let mut animation = state.animation.lock().await;
    if let Some(ms) = params.speed_ms {
        animation.speed = speed_from_millis(ms);
    }
    let speed_ms = animation.speed.as_millis() as u64;

    let was_running = animation.is_running();
    // Also reaps a driver that halted on its own.
    let ticks = animation.halt().await?;
    if was_running {
        info!(ticks = ticks.unwrap_or(0), "animation paused");
    } else {
        animation.driver = Some(spawn_driver(&state.session, animation.speed));
        info!(speed_ms, "animation running");
    }

    Ok(Json(ToggleResponse {
        running: !was_running,
        speed_ms,
    }))
}

async fn frame_handler(State(state): State<AppState>) -> Result<Json<FrameResponse>, ApiError> {
    let session = lock(&state.session);
    Ok(Json(frame(&session)?))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let seed = rand::random();
    let state = AppState::new(Session::new(SimulationConfig::default(), seed)?);

    let frontend = ServeDir::new("frontend");

    let app = Router::new()
        .route("/api/configure", post(configure_handler))
        .route("/api/step", post(step_handler))
        .route("/api/infect", post(infect_handler))
        .route("/api/cell", post(cell_handler))
        .route("/api/reset", post(reset_handler))
        .route("/api/toggle", post(toggle_handler))
        .route("/api/frame", get(frame_handler))
        .fallback_service(frontend)
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr: SocketAddr = match std::env::var("CONTAGION_ADDR") {
        Ok(raw) => raw.parse()?,
        Err(_) => SocketAddr::from(([127, 0, 0, 1], 3000)),
    };
    if addr.ip().is_unspecified() {
        warn!(%addr, "listening on all interfaces");
    }
    info!(%addr, seed, "contagion server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
