use anyhow::{bail, Context as _, Result};
use clap::Args;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use zeefit_client::session_store::REFRESH_TOKEN_KEY;
use zeefit_client::{
    cached_user, clear_all_auth_data, clear_draft, is_authenticated, load_draft, persist_session,
    save_draft, verify_request, ApiClient, ChallengeQuery, ClientConfig, FileSessionStore, Gender,
    HeightInput, ProfileUpdate, ProgressUpdate, RegistrationAnswers, RegistrationDraft,
    SendOtpRequest, SharedSessionStore,
};

pub struct Context {
    client: ApiClient,
    store: SharedSessionStore,
    session_path: PathBuf,
    compact: bool,
}

impl Context {
    pub fn new(config: &ClientConfig, session_file: Option<PathBuf>, compact: bool) -> Result<Self> {
        let session_path = match session_file {
            Some(path) => path,
            None => FileSessionStore::default_path()?,
        };
        let store: SharedSessionStore = Arc::new(FileSessionStore::new(&session_path));
        let client = ApiClient::from_config(config, store.clone())?;
        Ok(Self {
            client,
            store,
            session_path,
            compact,
        })
    }

    fn print<T: Serialize>(&self, value: &T) -> Result<()> {
        let out = if self.compact {
            serde_json::to_string(value)?
        } else {
            serde_json::to_string_pretty(value)?
        };
        println!("{out}");
        Ok(())
    }
}

fn device_label() -> String {
    format!(
        "zeefit-cli/{} ({})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS
    )
}

#[derive(Args)]
pub struct RegisterArgs {
    /// Phone number, digits only
    pub phone: String,
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub age: String,
    /// male, female or other
    #[arg(long)]
    pub gender: String,
    /// Height in centimeters
    #[arg(long, conflicts_with_all = ["height_ft", "height_in"])]
    pub height_cm: Option<f64>,
    /// Height in feet (with --height-in)
    #[arg(long)]
    pub height_ft: Option<f64>,
    #[arg(long)]
    pub height_in: Option<f64>,
    /// Weight in kilograms
    #[arg(long)]
    pub weight: f64,
    /// Motivation, Disciplined, Time or anything else
    #[arg(long, default_value = "")]
    pub holding_back: String,
    /// better_health, more_energy, increased_focus or anything else
    #[arg(long, default_value = "")]
    pub improve: String,
    /// lose_weight, gain_muscles, discipline or anything else
    #[arg(long, default_value = "")]
    pub challenge: String,
}

impl RegisterArgs {
    fn height(&self) -> Result<HeightInput> {
        match (self.height_cm, self.height_ft) {
            (Some(cm), _) => Ok(HeightInput::Centimeters(cm)),
            (None, Some(feet)) => Ok(HeightInput::FeetInches {
                feet,
                inches: self.height_in.unwrap_or(0.0),
            }),
            (None, None) => bail!("Pass --height-cm or --height-ft"),
        }
    }
}

#[derive(Args)]
pub struct ProfileArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub age: Option<u32>,
    #[arg(long)]
    pub gender: Option<String>,
    #[arg(long)]
    pub profile_pic: Option<String>,
    #[arg(long)]
    pub height_cm: Option<f64>,
    #[arg(long)]
    pub weight: Option<f64>,
    #[arg(long)]
    pub q1: Option<u8>,
    #[arg(long)]
    pub q2: Option<u8>,
    #[arg(long)]
    pub q3: Option<u8>,
    #[arg(long)]
    pub fcm_token: Option<String>,
}

impl ProfileArgs {
    fn into_update(self) -> Result<ProfileUpdate> {
        let gender = match self.gender.as_deref() {
            Some(raw) => {
                Some(Gender::parse(raw).with_context(|| format!("Unknown gender: {raw}"))?)
            }
            None => None,
        };
        Ok(ProfileUpdate {
            name: self.name,
            age: self.age,
            gender,
            profile_pic: self.profile_pic,
            height_in_cm: self.height_cm,
            weight_in_kg: self.weight,
            q1: self.q1,
            q2: self.q2,
            q3: self.q3,
            fcm_token: self.fcm_token,
        })
    }
}

#[derive(Args)]
pub struct ListArgs {
    /// draft, active or archived
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long)]
    pub page: Option<u32>,
    #[arg(long)]
    pub limit: Option<u32>,
}

impl ListArgs {
    fn query(self) -> ChallengeQuery {
        ChallengeQuery {
            status: self.status,
            page: self.page,
            limit: self.limit,
        }
    }
}

#[derive(Args)]
pub struct ProgressArgs {
    pub id: String,
    /// Progress metrics as a JSON object, e.g. '{"steps": 12000}'
    #[arg(long)]
    pub metrics: Option<String>,
    #[arg(long)]
    pub spirit_score: Option<f64>,
    #[arg(long)]
    pub consistency_pct: Option<f64>,
}

pub async fn otp_request(ctx: &Context, phone: &str, country_code: &str) -> Result<()> {
    let res = ctx
        .client
        .send_otp(&SendOtpRequest {
            phone: phone.to_string(),
            country_code: country_code.to_string(),
        })
        .await?;
    ctx.print(&res)
}

pub async fn otp_verify(
    ctx: &Context,
    phone: &str,
    otp: &str,
    country_code: &str,
    device: Option<String>,
) -> Result<()> {
    let store = ctx.store.as_ref();
    let draft = load_draft(store);
    if draft.is_none() {
        tracing::info!("no registration data stored, using default profile answers");
    }
    let req = verify_request(
        draft.as_ref(),
        phone,
        country_code,
        otp,
        Some(device.unwrap_or_else(device_label)),
    );

    let auth = ctx.client.verify_otp(&req).await?;
    persist_session(store, &auth)?;
    clear_draft(store)?;
    tracing::info!(user_id = %auth.user.id, "logged in");

    ctx.print(&json!({
        "message": "Logged in",
        "status_code": auth.status_code,
        "user": auth.user,
    }))
}

pub async fn register(ctx: &Context, args: RegisterArgs) -> Result<()> {
    let answers = RegistrationAnswers {
        height: args.height()?,
        name: args.name,
        age: args.age,
        gender: args.gender,
        weight_kg: args.weight,
        holding_back: args.holding_back,
        improve: args.improve,
        challenge: args.challenge,
        phone: args.phone,
    };
    let draft = RegistrationDraft::from_answers(&answers)?;
    save_draft(ctx.store.as_ref(), &draft)?;

    let res = ctx
        .client
        .send_otp(&SendOtpRequest {
            phone: draft.phone.clone(),
            country_code: draft.country_code.clone(),
        })
        .await
        .context("Failed to send OTP. Please try again.")?;
    ctx.print(&res)
}

pub async fn logout(ctx: &Context) -> Result<()> {
    let store = ctx.store.as_ref();
    let refresh = store.get(REFRESH_TOKEN_KEY).filter(|t| !t.is_empty());
    let message = match refresh {
        Some(token) => match ctx.client.logout(&token).await {
            Ok(res) => res.message,
            Err(e) => {
                tracing::warn!("backend logout failed, clearing local session anyway: {e}");
                "Logged out locally".to_string()
            }
        },
        None => "No active session".to_string(),
    };
    clear_all_auth_data(store)?;
    ctx.print(&json!({ "message": message }))
}

pub fn status(ctx: &Context) -> Result<()> {
    let store = ctx.store.as_ref();
    ctx.print(&json!({
        "authenticated": is_authenticated(store),
        "user": cached_user(store),
        "baseUrl": ctx.client.base_url(),
        "sessionFile": ctx.session_path.display().to_string(),
    }))
}

pub async fn me(ctx: &Context) -> Result<()> {
    let res = ctx.client.get_current_user().await?;
    ctx.print(&res)
}

pub async fn profile(ctx: &Context, args: ProfileArgs) -> Result<()> {
    let res = ctx.client.update_user_profile(&args.into_update()?).await?;
    ctx.print(&res)
}

pub async fn delete_account(ctx: &Context, confirmed: bool) -> Result<()> {
    if !confirmed {
        bail!("Refusing to delete the account without --yes");
    }
    let res = ctx.client.delete_user().await?;
    clear_all_auth_data(ctx.store.as_ref())?;
    ctx.print(&res)
}

pub async fn home(ctx: &Context) -> Result<()> {
    let res = ctx.client.get_home_data().await?;
    ctx.print(&res)
}

pub async fn challenges_list(ctx: &Context, args: ListArgs) -> Result<()> {
    let res = ctx.client.get_all_challenges(&args.query()).await?;
    ctx.print(&res)
}

pub async fn challenges_mine(ctx: &Context, args: ListArgs) -> Result<()> {
    let res = ctx.client.get_my_challenges(&args.query()).await?;
    ctx.print(&res)
}

pub async fn challenge_show(ctx: &Context, id: &str) -> Result<()> {
    let res = ctx.client.get_challenge_by_id(id).await?;
    ctx.print(&res)
}

pub async fn challenge_slug(ctx: &Context, slug: &str) -> Result<()> {
    let res = ctx.client.get_challenge_by_slug(slug).await?;
    ctx.print(&res)
}

pub async fn challenges_join(ctx: &Context, ids: &[String]) -> Result<()> {
    let res = ctx.client.join_multiple_challenges(ids).await;
    ctx.print(&res)
}

pub async fn challenge_progress(ctx: &Context, id: &str) -> Result<()> {
    let res = ctx.client.get_challenge_progress(id).await?;
    ctx.print(&res)
}

pub async fn update_progress(ctx: &Context, args: ProgressArgs) -> Result<()> {
    let progress_metrics = match args.metrics.as_deref() {
        Some(raw) => Some(
            serde_json::from_str::<Map<String, Value>>(raw)
                .context("--metrics must be a JSON object")?,
        ),
        None => None,
    };
    let update = ProgressUpdate {
        progress_metrics,
        spirit_score: args.spirit_score,
        consistency_pct: args.consistency_pct,
    };
    let res = ctx.client.update_challenge_progress(&args.id, &update).await?;
    ctx.print(&res)
}
