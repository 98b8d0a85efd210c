//! Single binary web server: admin commands and scoreboard reads via REST, live events
//! via long-poll.
//! Run with: cargo run --bin web
//! Listens on 0.0.0.0:8080 by default so the app is reachable via DNS on a VPS.
//! Override with env: HOST, PORT, DATA_DIR, TOURNAMENT_YEAR, HALF_TIME_MINUTES.

use actix_web::{
    delete, get, post, put,
    web::{Data, Json, Path, Query},
    App, HttpResponse, HttpServer, Responder,
};
use chrono::{DateTime, Utc};
use cup_referee::{
    AppConfig, BroadcastSink, Format, JsonFileStore, KnockoutOptions, MatchId, Orchestrator,
    Phase, TournamentConfig, TournamentError, TournamentStatus,
};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use std::time::Duration;

type Engine = Orchestrator<JsonFileStore, BroadcastSink>;

/// One tournament behind a lock: every command runs under the write guard.
type AppState = Data<RwLock<Engine>>;

/// Events kept for replay; a client further behind than this reloads the tournament.
const EVENT_CAPACITY: usize = 256;

const DEFAULT_POLL_SECS: u64 = 25;
const MAX_POLL_SECS: u64 = 60;

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
}

#[derive(Deserialize)]
struct RegisterTeamBody {
    name: String,
    #[serde(default)]
    color: String,
    #[serde(default)]
    contact: Option<String>,
}

#[derive(Deserialize)]
struct KnockoutBody {
    #[serde(default)]
    table: Option<Vec<String>>,
    #[serde(default)]
    options: Option<KnockoutOptions>,
}

#[derive(Deserialize)]
struct ResultBody {
    score1: u32,
    score2: u32,
    #[serde(default)]
    penalties: Option<(u32, u32)>,
}

#[derive(Deserialize)]
struct LiveScoreBody {
    score1: u32,
    score2: u32,
}

#[derive(Deserialize)]
struct AddMatchBody {
    team1: String,
    team2: String,
    label: String,
    #[serde(default = "default_phase")]
    phase: Phase,
}

fn default_phase() -> Phase {
    Phase::Group
}

#[derive(Deserialize)]
struct ScheduleBody {
    start: DateTime<Utc>,
    slot_minutes: u32,
    fields: Vec<String>,
}

#[derive(Deserialize)]
struct StatusBody {
    status: TournamentStatus,
}

#[derive(Deserialize, Default)]
struct StartBody {
    #[serde(default)]
    half_time_minutes: Option<u32>,
}

#[derive(Deserialize)]
struct EventsQuery {
    since: Option<u64>,
    timeout_secs: Option<u64>,
}

#[derive(Deserialize, Default)]
struct FinishBody {
    #[serde(default)]
    penalties: Option<(u32, u32)>,
}

/// Path segment: match id (e.g. /api/matches/{id}/start)
#[derive(Deserialize)]
struct MatchPath {
    id: MatchId,
}

/// Path segment: team name (e.g. /api/teams/{name})
#[derive(Deserialize)]
struct TeamPath {
    name: String,
}

fn error_response(e: &TournamentError) -> HttpResponse {
    let body = serde_json::json!({ "error": e.to_string() });
    match e {
        TournamentError::MatchNotFound(_) | TournamentError::TeamNotFound(_) => {
            HttpResponse::NotFound().json(body)
        }
        TournamentError::ConcurrentLiveMatch { .. }
        | TournamentError::InvalidTransition { .. }
        | TournamentError::MatchIsLive(_) => HttpResponse::Conflict().json(body),
        TournamentError::Infeasible(analysis) => HttpResponse::BadRequest()
            .json(serde_json::json!({ "error": e.to_string(), "analysis": analysis })),
        _ => HttpResponse::BadRequest().json(body),
    }
}

fn lock_error() -> HttpResponse {
    HttpResponse::InternalServerError().body("lock error")
}

/// Run one admin command under the write lock and answer with its result as JSON.
fn command<T: Serialize>(
    state: &AppState,
    op: impl FnOnce(&mut Engine) -> Result<T, TournamentError>,
) -> HttpResponse {
    let mut g = match state.write() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match op(&mut g) {
        Ok(value) => HttpResponse::Ok().json(value),
        Err(e) => error_response(&e),
    }
}

#[get("/api/health")]
async fn api_health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        service: "cup-referee",
    })
}

/// Full tournament snapshot.
#[get("/api/tournament")]
async fn api_get_tournament(state: AppState) -> HttpResponse {
    match state.read() {
        Ok(g) => HttpResponse::Ok().json(g.tournament()),
        Err(_) => lock_error(),
    }
}

#[get("/api/standings")]
async fn api_standings(state: AppState) -> HttpResponse {
    let g = match state.read() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    let groups: Vec<_> = g
        .standings()
        .into_iter()
        .map(|(group, table)| serde_json::json!({ "group": group, "table": table }))
        .collect();
    HttpResponse::Ok().json(groups)
}

#[get("/api/final-table")]
async fn api_final_table(state: AppState) -> HttpResponse {
    match state.read() {
        Ok(g) => HttpResponse::Ok().json(g.final_table()),
        Err(_) => lock_error(),
    }
}

/// Live clock for scoreboards; 204 when no match is live.
#[get("/api/clock")]
async fn api_clock(state: AppState) -> HttpResponse {
    let g = match state.read() {
        Ok(guard) => guard,
        Err(_) => return lock_error(),
    };
    match g.clock_reading(Utc::now()) {
        Some(clock) => HttpResponse::Ok().json(clock),
        None => HttpResponse::NoContent().finish(),
    }
}

/// Long-poll: events after `since`, waiting up to the timeout for the first one.
/// Without `since` only events published from now on count. Clients pass the
/// returned `next` as `since` on the following request.
#[get("/api/events")]
async fn api_events(sink: Data<BroadcastSink>, query: Query<EventsQuery>) -> HttpResponse {
    let since = query.since.unwrap_or_else(|| sink.latest());
    // Subscribe before reading the log so nothing published in between is slept through.
    let mut rx = sink.subscribe();
    let batch = sink.since(since);
    if !batch.events.is_empty() || batch.missed {
        return HttpResponse::Ok().json(batch);
    }
    let wait = query
        .timeout_secs
        .unwrap_or(DEFAULT_POLL_SECS)
        .min(MAX_POLL_SECS);
    if let Ok(Err(e)) = tokio::time::timeout(Duration::from_secs(wait), rx.recv()).await {
        log::debug!("event subscriber: {}", e);
    }
    HttpResponse::Ok().json(sink.since(since))
}

#[post("/api/teams")]
async fn api_register_team(state: AppState, body: Json<RegisterTeamBody>) -> HttpResponse {
    let body = body.into_inner();
    command(&state, |o| {
        o.register_team(&body.name, &body.color, body.contact, Utc::now())
    })
}

#[delete("/api/teams/{name}")]
async fn api_remove_team(state: AppState, path: Path<TeamPath>) -> HttpResponse {
    command(&state, |o| o.remove_team(&path.name))
}

/// CSV body with header `name,color,contact`.
#[post("/api/teams/import")]
async fn api_import_teams(state: AppState, body: String) -> HttpResponse {
    command(&state, |o| o.import_teams_csv(body.as_bytes(), Utc::now()))
}

#[post("/api/format/analyze")]
async fn api_analyze_format(state: AppState, body: Json<Format>) -> HttpResponse {
    match state.read() {
        Ok(g) => HttpResponse::Ok().json(g.analyze_config(&body)),
        Err(_) => lock_error(),
    }
}

#[post("/api/registration/close")]
async fn api_close_registration(state: AppState, body: Json<TournamentConfig>) -> HttpResponse {
    command(&state, |o| o.close_registration(body.into_inner()).map(|f| f.matches))
}

/// Discard the fixtures and regenerate them for a new configuration.
#[put("/api/config")]
async fn api_reconfigure(state: AppState, body: Json<TournamentConfig>) -> HttpResponse {
    command(&state, |o| o.reconfigure(body.into_inner()).map(|f| f.matches))
}

#[post("/api/swiss/next")]
async fn api_next_swiss_round(state: AppState) -> HttpResponse {
    command(&state, |o| o.next_swiss_round().map(|r| r.matches))
}

#[post("/api/knockout")]
async fn api_generate_knockout(state: AppState, body: Option<Json<KnockoutBody>>) -> HttpResponse {
    let (table, options) = match body {
        Some(b) => {
            let b = b.into_inner();
            (b.table, b.options)
        }
        None => (None, None),
    };
    command(&state, |o| o.generate_knockout(table, options))
}

#[post("/api/penalties")]
async fn api_generate_penalties(state: AppState) -> HttpResponse {
    command(&state, |o| o.generate_penalty_shootouts())
}

#[post("/api/matches")]
async fn api_add_match(state: AppState, body: Json<AddMatchBody>) -> HttpResponse {
    command(&state, |o| o.add_match(&body.team1, &body.team2, &body.label, body.phase))
}

#[delete("/api/matches/{id}")]
async fn api_delete_match(state: AppState, path: Path<MatchPath>) -> HttpResponse {
    command(&state, |o| o.delete_match(path.id))
}

#[put("/api/matches/{id}/result")]
async fn api_record_result(
    state: AppState,
    path: Path<MatchPath>,
    body: Json<ResultBody>,
) -> HttpResponse {
    command(&state, |o| {
        o.record_result(path.id, body.score1, body.score2, body.penalties)
    })
}

#[post("/api/schedule")]
async fn api_schedule(state: AppState, body: Json<ScheduleBody>) -> HttpResponse {
    command(&state, |o| {
        o.schedule_matches(body.start, body.slot_minutes, &body.fields)
            .map(|scheduled| serde_json::json!({ "scheduled": scheduled }))
    })
}

/// Admin override of the tournament status.
#[put("/api/status")]
async fn api_set_status(state: AppState, body: Json<StatusBody>) -> HttpResponse {
    command(&state, |o| {
        o.set_status(body.status);
        Ok(o.tournament().status)
    })
}

/// Back to registration with the same teams.
#[post("/api/reset")]
async fn api_reset(state: AppState) -> HttpResponse {
    command(&state, |o| {
        o.reset();
        Ok(o.tournament().clone())
    })
}

#[post("/api/matches/{id}/start")]
async fn api_start_match(
    state: AppState,
    path: Path<MatchPath>,
    body: Option<Json<StartBody>>,
) -> HttpResponse {
    let half = body.map(|b| b.into_inner()).unwrap_or_default().half_time_minutes;
    command(&state, |o| o.start_match(path.id, half, Utc::now()))
}

#[post("/api/matches/{id}/pause")]
async fn api_pause_match(state: AppState, path: Path<MatchPath>) -> HttpResponse {
    command(&state, |o| o.pause_match(path.id, Utc::now()))
}

#[post("/api/matches/{id}/resume")]
async fn api_resume_match(state: AppState, path: Path<MatchPath>) -> HttpResponse {
    command(&state, |o| o.resume_match(path.id, Utc::now()))
}

#[post("/api/matches/{id}/halftime")]
async fn api_start_halftime(state: AppState, path: Path<MatchPath>) -> HttpResponse {
    command(&state, |o| o.start_halftime(path.id, Utc::now()))
}

#[post("/api/matches/{id}/second-half")]
async fn api_start_second_half(state: AppState, path: Path<MatchPath>) -> HttpResponse {
    command(&state, |o| o.start_second_half(path.id, Utc::now()))
}

/// Optional body `{"penalties": [4, 3]}` for a level match that needs a winner.
#[post("/api/matches/{id}/finish")]
async fn api_finish_match(
    state: AppState,
    path: Path<MatchPath>,
    body: Option<Json<FinishBody>>,
) -> HttpResponse {
    let penalties = body.map(|b| b.into_inner()).unwrap_or_default().penalties;
    command(&state, |o| o.finish_match(path.id, penalties))
}

#[post("/api/matches/{id}/abort")]
async fn api_abort_match(state: AppState, path: Path<MatchPath>) -> HttpResponse {
    command(&state, |o| o.abort_match(path.id))
}

#[put("/api/matches/{id}/live-score")]
async fn api_live_score(
    state: AppState,
    path: Path<MatchPath>,
    body: Json<LiveScoreBody>,
) -> HttpResponse {
    command(&state, |o| o.update_live_score(path.id, body.score1, body.score2))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env();
    let store = JsonFileStore::new(&config.data_dir);
    let sink = BroadcastSink::new(EVENT_CAPACITY);
    let orchestrator = Orchestrator::load(config.year, store, sink.clone())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?
        .with_default_half_time(config.half_time_minutes);

    let bind = (config.host.clone(), config.port);
    log::info!(
        "Starting server at http://{}:{} (tournament {}, data in {})",
        bind.0,
        bind.1,
        config.year,
        config.data_dir.display()
    );

    let state = Data::new(RwLock::new(orchestrator));
    let events = Data::new(sink);
    let app_state = state.clone();

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(events.clone())
            .service(api_health)
            .service(api_get_tournament)
            .service(api_standings)
            .service(api_final_table)
            .service(api_clock)
            .service(api_events)
            .service(api_import_teams)
            .service(api_register_team)
            .service(api_remove_team)
            .service(api_analyze_format)
            .service(api_close_registration)
            .service(api_reconfigure)
            .service(api_next_swiss_round)
            .service(api_generate_knockout)
            .service(api_generate_penalties)
            .service(api_add_match)
            .service(api_delete_match)
            .service(api_record_result)
            .service(api_schedule)
            .service(api_set_status)
            .service(api_reset)
            .service(api_start_match)
            .service(api_pause_match)
            .service(api_resume_match)
            .service(api_start_halftime)
            .service(api_start_second_half)
            .service(api_finish_match)
            .service(api_abort_match)
            .service(api_live_score)
    })
    .bind(bind)?
    .run()
    .await?;

    match state.read() {
        Ok(g) => {
            if let Err(e) = g.save() {
                log::error!("final snapshot failed: {}", e);
            }
        }
        Err(_) => log::error!("final snapshot skipped: lock poisoned"),
    };
    Ok(())
}
