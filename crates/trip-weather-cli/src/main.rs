use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

use trip_weather::{
    cache::{Cache, FileCache},
    config::{FALLBACK_MIN_YEARS, FALLBACK_YEARS_BACK, LOG_FILTER_ENV, RuntimeConfig},
    error::{
        AppError, ERROR_CODE_RUNTIME_PROVIDER_INIT, ERROR_CODE_RUNTIME_SERIALIZE,
        ERROR_CODE_USER_OUTPUT_MODE_CONFLICT,
    },
    fallback::FallbackPolicy,
    geocoding::geocode_destination,
    model::{
        Coordinates, LocationQuery, RequestedMode, Spot, ValidationError, WeatherProfile,
        WeatherRequest, normalize_destination, parse_iso_date, validate_coordinates,
        validate_radius_km,
    },
    providers::{HttpProviders, ProviderApi},
    service::{
        DEFAULT_RANK_RADIUS_KM, DEFAULT_TOP_K, RankRequest, ResolveOptions, rank_spots,
        resolve_weather_profile,
    },
    spots::{
        DEFAULT_MAX_ELEMENTS, DEFAULT_PARKS_MAX_ELEMENTS, DEFAULT_PARKS_RADIUS_KM,
        get_activity_spots, get_parks_nearby, normalize_activity,
    },
    weather_code::summary_en,
};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Trip weather profiles and activity spots (free no-token APIs)"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve a destination name to coordinates.
    Geocode {
        #[arg(long)]
        destination: String,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Weather profile for a date range: forecast, archive or estimate.
    Weather {
        #[arg(long)]
        destination: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        lon: Option<f64>,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(long, default_value = "auto")]
        mode: String,
        #[arg(long, default_value_t = FALLBACK_YEARS_BACK)]
        years_back: u32,
        #[arg(long, default_value_t = FALLBACK_MIN_YEARS)]
        min_years: usize,
        #[arg(long)]
        include_raw: bool,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Named places around a point that suit an activity.
    Spots {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        #[arg(long)]
        activity: String,
        #[arg(long, default_value_t = DEFAULT_RANK_RADIUS_KM)]
        radius_km: f64,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Parks near a point, nearest first.
    Parks {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        #[arg(long, default_value_t = DEFAULT_PARKS_RADIUS_KM)]
        radius_km: f64,
        #[arg(long, default_value_t = DEFAULT_PARKS_MAX_ELEMENTS)]
        max_elements: usize,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Activity spots scored against the trip weather.
    Rank {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
        #[arg(long)]
        activity: String,
        #[arg(long, default_value_t = DEFAULT_RANK_RADIUS_KM)]
        radius_km: f64,
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Debug, Clone, Copy, Args)]
struct OutputArgs {
    #[arg(long, value_enum)]
    output: Option<OutputModeArg>,
    #[arg(long)]
    json: bool,
}

const ENVELOPE_SCHEMA_VERSION: &str = "v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputModeArg {
    Human,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CliOutputMode {
    Human,
    Json,
}

impl From<OutputModeArg> for CliOutputMode {
    fn from(value: OutputModeArg) -> Self {
        match value {
            OutputModeArg::Human => CliOutputMode::Human,
            OutputModeArg::Json => CliOutputMode::Json,
        }
    }
}

impl Commands {
    fn output_args(&self) -> OutputArgs {
        match self {
            Commands::Geocode { output, .. }
            | Commands::Weather { output, .. }
            | Commands::Spots { output, .. }
            | Commands::Parks { output, .. }
            | Commands::Rank { output, .. } => *output,
        }
    }
}

impl Cli {
    fn command_name(&self) -> &'static str {
        match &self.command {
            Commands::Geocode { .. } => "trip.geocode",
            Commands::Weather { .. } => "trip.weather",
            Commands::Spots { .. } => "trip.spots",
            Commands::Parks { .. } => "trip.parks",
            Commands::Rank { .. } => "trip.rank",
        }
    }

    fn output_mode_hint(&self) -> CliOutputMode {
        let args = self.command.output_args();
        if args.json {
            CliOutputMode::Json
        } else if let Some(explicit) = args.output {
            explicit.into()
        } else {
            CliOutputMode::Human
        }
    }
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let command = cli.command_name();
    let output_mode = cli.output_mode_hint();
    match run(cli) {
        Ok(output) => println!("{output}"),
        Err(error) => {
            emit_error(command, output_mode, &error);
            std::process::exit(error.exit_code());
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<String, AppError> {
    let config = RuntimeConfig::from_env();
    let providers = HttpProviders::new(&config)
        .map_err(|error| AppError::runtime(ERROR_CODE_RUNTIME_PROVIDER_INIT, error.to_string()))?;
    let file_cache = config
        .cache_enabled
        .then(|| FileCache::new(&config.cache_dir, config.cache_ttl_secs));
    let cache = file_cache.as_ref().map(|cache| cache as &dyn Cache);
    let today = Local::now().date_naive();

    run_with(cli, &config, &providers, cache, today)
}

fn run_with(
    cli: Cli,
    config: &RuntimeConfig,
    providers: &dyn ProviderApi,
    cache: Option<&dyn Cache>,
    today: NaiveDate,
) -> Result<String, AppError> {
    let command = cli.command_name();
    let args = cli.command.output_args();
    let output_mode = resolve_output_mode(args.output, args.json, CliOutputMode::Human)?;

    let (result, human) = match cli.command {
        Commands::Geocode { destination, .. } => {
            let destination = normalize_destination(&destination)?;
            let coords = geocode_destination(providers, cache, &destination)?;
            (
                json!({"destination": destination, "lat": coords.lat, "lon": coords.lon}),
                format!("{destination}: {coords}"),
            )
        }
        Commands::Weather {
            destination,
            lat,
            lon,
            start,
            end,
            mode,
            years_back,
            min_years,
            include_raw,
            ..
        } => {
            let request = WeatherRequest::new(destination.as_deref(), lat, lon, &start, &end)?;
            let requested = mode.trim().parse::<RequestedMode>()?;
            let fallback = FallbackPolicy::new(years_back, min_years)?;
            let coords = match &request.location {
                LocationQuery::Destination(destination) => {
                    geocode_destination(providers, cache, destination)?
                }
                LocationQuery::Coordinates(coords) => *coords,
            };
            let options = ResolveOptions {
                mode: requested,
                fallback,
                include_raw,
                forecast_horizon_days: config.forecast_horizon_days,
            };
            let profile = resolve_weather_profile(
                providers,
                cache,
                today,
                coords,
                request.start,
                request.end,
                &options,
            )?;
            (
                json!({"coordinates": coords, "profile": to_value(&profile)?}),
                format_profile(coords, &profile),
            )
        }
        Commands::Spots {
            lat,
            lon,
            activity,
            radius_km,
            ..
        } => {
            let coords = validate_coordinates(lat, lon)?;
            let radius_km = validate_radius_km(radius_km)?;
            let activity = require_activity(&activity)?;
            let spots = get_activity_spots(
                providers,
                cache,
                coords,
                radius_km,
                activity,
                DEFAULT_MAX_ELEMENTS,
            )?;
            (
                json!({
                    "activity": normalize_activity(activity),
                    "radius_km": radius_km,
                    "spots": to_value(&spots)?,
                }),
                format_spots(&spots),
            )
        }
        Commands::Parks {
            lat,
            lon,
            radius_km,
            max_elements,
            ..
        } => {
            let coords = validate_coordinates(lat, lon)?;
            let radius_km = validate_radius_km(radius_km)?;
            let parks = get_parks_nearby(providers, cache, coords, radius_km, max_elements)?;
            (
                json!({"radius_km": radius_km, "parks": to_value(&parks)?}),
                format_spots(&parks),
            )
        }
        Commands::Rank {
            lat,
            lon,
            start,
            end,
            activity,
            radius_km,
            top_k,
            ..
        } => {
            let request = RankRequest {
                coords: validate_coordinates(lat, lon)?,
                start: parse_iso_date(&start)?,
                end: parse_iso_date(&end)?,
                activity: require_activity(&activity)?.to_string(),
                radius_km: validate_radius_km(radius_km)?,
                top_k,
            };
            let options = ResolveOptions {
                forecast_horizon_days: config.forecast_horizon_days,
                ..ResolveOptions::default()
            };
            let ranked = rank_spots(providers, cache, today, &request, &options)?;
            (
                json!({
                    "activity": normalize_activity(&request.activity),
                    "weather": to_value(&ranked.weather)?,
                    "spots": to_value(&ranked.spots)?,
                }),
                format!(
                    "{}\n{}",
                    format_profile(request.coords, &ranked.weather),
                    format_spots(&ranked.spots)
                ),
            )
        }
    };

    match output_mode {
        CliOutputMode::Json => render_json_envelope(command, result),
        CliOutputMode::Human => Ok(human),
    }
}

fn require_activity(raw: &str) -> Result<&str, ValidationError> {
    let activity = raw.trim();
    if activity.is_empty() {
        return Err(ValidationError::EmptyActivity);
    }
    Ok(activity)
}

fn resolve_output_mode(
    output: Option<OutputModeArg>,
    json_flag: bool,
    default_mode: CliOutputMode,
) -> Result<CliOutputMode, AppError> {
    match (output.map(Into::into), json_flag) {
        (Some(mode), true) if mode != CliOutputMode::Json => Err(AppError::user(
            ERROR_CODE_USER_OUTPUT_MODE_CONFLICT,
            format!(
                "conflicting output flags: --json requires --output json (got {})",
                output_mode_label(mode)
            ),
        )),
        (Some(mode), _) => Ok(mode),
        (None, true) => Ok(CliOutputMode::Json),
        (None, false) => Ok(default_mode),
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, AppError> {
    serde_json::to_value(value).map_err(|error| {
        AppError::runtime(
            ERROR_CODE_RUNTIME_SERIALIZE,
            format!("failed to serialize output: {error}"),
        )
    })
}

fn render_json_envelope(command: &str, result: Value) -> Result<String, AppError> {
    serde_json::to_string(&json!({
        "schema_version": ENVELOPE_SCHEMA_VERSION,
        "command": command,
        "ok": true,
        "result": result,
    }))
    .map_err(|error| {
        AppError::runtime(
            ERROR_CODE_RUNTIME_SERIALIZE,
            format!("failed to serialize output envelope: {error}"),
        )
    })
}

fn emit_error(command: &str, output_mode: CliOutputMode, error: &AppError) {
    match output_mode {
        CliOutputMode::Json => {
            let payload = json!({
                "schema_version": ENVELOPE_SCHEMA_VERSION,
                "command": command,
                "ok": false,
                "error": {
                    "code": error.code,
                    "message": error.message,
                    "details": {
                        "kind": error.kind_label(),
                        "exit_code": error.exit_code(),
                    }
                }
            });
            let rendered = serde_json::to_string(&payload).unwrap_or_else(|_| {
                format!(
                    "{{\"schema_version\":\"{ENVELOPE_SCHEMA_VERSION}\",\"command\":\"{command}\",\"ok\":false,\"error\":{{\"code\":\"{ERROR_CODE_RUNTIME_SERIALIZE}\",\"message\":\"failed to serialize error envelope\"}}}}"
                )
            });
            println!("{rendered}");
        }
        CliOutputMode::Human => {
            eprintln!("error[{}]: {}", error.code, error.message);
        }
    }
}

fn output_mode_label(mode: CliOutputMode) -> &'static str {
    match mode {
        CliOutputMode::Human => "human",
        CliOutputMode::Json => "json",
    }
}

fn format_profile(coords: Coordinates, profile: &WeatherProfile) -> String {
    let mut header = format!(
        "{}..{} at {} source={}",
        profile.start_date, profile.end_date, coords, profile.source
    );
    if profile.is_estimate {
        let years = profile
            .reference_years
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        header.push_str(&format!(" estimate_from={years}"));
    }

    let mut lines = vec![header];
    for day in &profile.days {
        lines.push(format!(
            "{} {} {}~{}°C precip:{}mm wind:{}km/h",
            day.date,
            day.weather_code.map(summary_en).unwrap_or("n/a"),
            format_number(day.temp_min_c),
            format_number(day.temp_max_c),
            format_number(day.precipitation_mm),
            format_number(day.wind_max_kmh),
        ));
    }
    lines.push(format!(
        "range {}~{}°C precip:{}mm rainy_days:{} wind_max:{}km/h",
        format_number(profile.temp_min_c),
        format_number(profile.temp_max_c),
        format_number(profile.precip_total_mm),
        profile.rainy_days.unwrap_or(0),
        format_number(profile.wind_max_kmh),
    ));
    lines.join("\n")
}

fn format_spots(spots: &[Spot]) -> String {
    if spots.is_empty() {
        return "no spots found".to_string();
    }

    spots
        .iter()
        .map(|spot| {
            let mut line = format!("{} ({:.5},{:.5})", spot.name, spot.lat, spot.lon);
            if let Some(distance_km) = spot.distance_km {
                line.push_str(&format!(" {distance_km:.2}km"));
            }
            if let Some(minutes) = spot.travel_time_min {
                line.push_str(&format!(" ~{minutes:.0}min"));
            }
            if let Some(score) = spot.score {
                line.push_str(&format!(" score={score:.1}"));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_number(value: Option<f64>) -> String {
    value
        .map(|value| format!("{value:.1}"))
        .unwrap_or_else(|| "-".to_string())
}
