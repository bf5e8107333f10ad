use anyhow::{Context, Result, bail};
use std::env;

use crate::scheduler::Schedule;
use crate::types::GenType;

pub const URL_LANDING: &str = "https://dhlottery.co.kr/gameResult.do?method=byWin&wiselog=H_C_1_1";
pub const URL_MAIN: &str = "https://dhlottery.co.kr/common.do?method=main";
pub const URL_SYSTEM_CHECK: &str = "https://dhlottery.co.kr/index_check.html";
pub const URL_RSA_KEY: &str = "https://www.dhlottery.co.kr/login.do?method=getLoginRsaKey";
pub const URL_LOGIN: &str = "https://www.dhlottery.co.kr/userSsl.do?method=login";
pub const URL_PWD_SKIP: &str = "https://www.dhlottery.co.kr/userSsl.do?method=chgPwdLater";
pub const URL_MAIN_INFO: &str = "https://www.dhlottery.co.kr/common.do?method=mainInfo";
pub const URL_MYPAGE: &str = "https://www.dhlottery.co.kr/userSsl.do?method=myPage";
pub const URL_GAME_PAGE: &str = "https://ol.dhlottery.co.kr/olotto/game/game645.do";
pub const URL_USER_READY: &str = "https://ol.dhlottery.co.kr/olotto/game/egovUserReadySocket.json";
pub const URL_BUY: &str = "https://ol.dhlottery.co.kr/olotto/game/execBuy.do";
pub const URL_ALL_RESULTS: &str = "https://dhlottery.co.kr/gameResult.do?method=allWinPrint&gubun=byWin";
pub const URL_WINQR: &str = "https://m.dhlottery.co.kr/qr.do?method=winQr";
pub const URL_TELEGRAM_API: &str = "https://api.telegram.org";

pub const MAX_GAME_COUNT: u8 = 5;

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub user_id: String,
    pub user_pw: String,
    pub game_count: u8,
    pub gen_type: GenType,
    /// Wire code the current protocol version uses for auto-generated games.
    pub auto_code: String,
    /// User-pinned numbers per game slot, already range-filtered.
    pub pinned: [Vec<u8>; 5],
    pub telegram: Option<TelegramConfig>,
    pub database_url: String,
    pub buy_schedule: Schedule,
    pub check_schedule: Schedule,
}

pub fn load() -> Result<Config> {
    let user_id = required("LOTTO_USER_ID")?;
    let user_pw = required("LOTTO_USER_PW")?;

    let game_count: u8 = env::var("LOTTO_BUY_COUNT")
        .unwrap_or_else(|_| "5".to_string())
        .trim()
        .parse()
        .context("LOTTO_BUY_COUNT is not a number")?;
    if game_count < 1 || game_count > MAX_GAME_COUNT {
        bail!("LOTTO_BUY_COUNT must be between 1 and {MAX_GAME_COUNT}");
    }

    let gen_type_name = env::var("LOTTO_GEN_TYPE").unwrap_or_else(|_| "auto".to_string());
    let gen_type = GenType::from_name(&gen_type_name)
        .with_context(|| format!("unknown LOTTO_GEN_TYPE: {gen_type_name}"))?;

    let auto_code = env::var("LOTTO_AUTO_CODE").unwrap_or_else(|_| "0".to_string());

    let pinned = [
        pinned_numbers(1),
        pinned_numbers(2),
        pinned_numbers(3),
        pinned_numbers(4),
        pinned_numbers(5),
    ];

    let telegram = match (env::var("TELEGRAM_BOT_TOKEN"), env::var("TELEGRAM_CHAT_ID")) {
        (Ok(bot_token), Ok(chat_id)) => Some(TelegramConfig { bot_token, chat_id }),
        _ => None,
    };

    let database_url =
        env::var("LOTTO_DB_PATH").unwrap_or_else(|_| "data/lottobot.db".to_string());

    let buy_schedule = Schedule::parse(
        &env::var("LOTTO_BUY_SCHEDULE").unwrap_or_else(|_| "Sat 13:00".to_string()),
    )
    .context("invalid LOTTO_BUY_SCHEDULE")?;
    let check_schedule = Schedule::parse(
        &env::var("LOTTO_CHECK_SCHEDULE").unwrap_or_else(|_| "Sat 21:30".to_string()),
    )
    .context("invalid LOTTO_CHECK_SCHEDULE")?;

    Ok(Config {
        user_id,
        user_pw,
        game_count,
        gen_type,
        auto_code,
        pinned,
        telegram,
        database_url,
        buy_schedule,
        check_schedule,
    })
}

fn required(key: &str) -> Result<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => bail!("{key} is not set"),
    }
}

/// `LOTTO_GAME{n}` holds space-separated numbers to pin for that slot,
/// e.g. `LOTTO_GAME1="3 7 15 22 30 41"`. Out-of-range tokens are dropped.
fn pinned_numbers(slot: usize) -> Vec<u8> {
    env::var(format!("LOTTO_GAME{slot}"))
        .unwrap_or_default()
        .split_whitespace()
        .filter_map(|token| token.parse::<u8>().ok())
        .filter(|n| (1..=45).contains(n))
        .collect()
}
