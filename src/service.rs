use tracing::{debug, info, warn};

use crate::buy;
use crate::client::LottoClient;
use crate::config::{Config, URL_WINQR};
use crate::error::{LottoError, Result};
use crate::login;
use crate::notify::Notifier;
use crate::scheduler;
use crate::scrape;
use crate::store::Store;
use crate::types::PurchaseReceipt;

/// Owns the session client, the config, the store and the notification
/// sink for the lifetime of the process. One cycle runs at a time.
pub struct LottoService {
    client: LottoClient,
    config: Config,
    store: Store,
    notifier: Notifier,
}

impl LottoService {
    pub fn new(config: Config, store: Store) -> Result<LottoService> {
        let client = LottoClient::new()?;
        let notifier = Notifier::new(config.telegram.clone());
        Ok(LottoService {
            client,
            config,
            store,
            notifier,
        })
    }

    /// Login plus purchase; every outcome becomes exactly one notification.
    pub async fn run_buy_cycle(&self) {
        info!("starting a purchase cycle");
        match self.buy_once().await {
            Ok(receipt) => {
                info!(
                    "purchased round {} for {} won",
                    receipt.round, receipt.amount
                );
                self.notifier
                    .notify("구매 성공", &format_receipt(&receipt))
                    .await;
            }
            Err(e) => {
                warn!("purchase cycle failed: {e}");
                self.notifier.notify(title_for(&e), &e.to_string()).await;
            }
        }
    }

    async fn buy_once(&self) -> Result<PurchaseReceipt> {
        login::login(&self.client, &self.config.user_id, &self.config.user_pw).await?;
        buy::buy(&self.client, &self.config, &self.store).await
    }

    /// Announce the latest winning numbers once per draw date, plus the
    /// win-check link when this round was bought here.
    pub async fn run_winner_check(&self) {
        let today = scheduler::today_kst();
        match self.store.last_round() {
            Ok(Some(last)) if last.date == today => {
                debug!("winning numbers for {today} were already announced");
                return;
            }
            Ok(_) => {}
            Err(e) => warn!("could not read the last announced round: {e}"),
        }

        let round = match scrape::fetch_last_round(&self.client).await {
            Ok(round) => round,
            Err(e) => {
                warn!("winner check failed: {e}");
                self.notifier.notify("당첨번호 조회 실패", &e.to_string()).await;
                return;
            }
        };

        let drawn = round
            .numbers
            .iter()
            .map(u8::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        self.notifier
            .notify(
                &format!("제 {}회 당첨번호", round.round),
                &format!("{drawn} + {}", round.bonus_no),
            )
            .await;

        if let Err(e) = self.store.set_last_round(&round) {
            warn!("could not remember round {}: {e}", round.round);
        }

        match self.store.purchased_numbers(round.round) {
            Ok(Some(numbers)) => {
                self.notifier
                    .notify(
                        &format!("제 {}회 당첨 확인 링크", round.round),
                        &win_qr_link(round.round, &numbers),
                    )
                    .await;
            }
            Ok(None) => {}
            Err(e) => warn!("could not read the purchase record: {e}"),
        }
    }
}

fn title_for(error: &LottoError) -> &'static str {
    match error {
        LottoError::Maintenance => "점검 안내",
        LottoError::Auth(_) | LottoError::CipherInit(_) => "로그인 실패",
        LottoError::Buy(_) => "구매 실패",
        _ => "구매 오류",
    }
}

fn format_receipt(receipt: &PurchaseReceipt) -> String {
    let mut lines = vec![
        format!("제 {}회 / {}원", receipt.round, format_won(receipt.amount)),
        format!("바코드: {}", receipt.bar_codes.join(" ")),
        "구매번호:".to_string(),
    ];
    for game in &receipt.games {
        // drop the gen-type marker digit the portal glues onto each line
        let shown = game.get(..game.len().saturating_sub(1)).unwrap_or(game);
        lines.push(format!("  {shown}"));
    }
    lines.push(format!("남은 예치금: {}원", format_won(receipt.remaining)));
    if receipt.low_balance {
        lines.push("예치금이 다음 구매에 부족합니다. 충전이 필요해요.".to_string());
    }
    lines.push(format!("결과: {}", receipt.result_msg));
    lines.join("\n")
}

/// Mobile win-check link: round plus every game's numbers, two digits
/// each, games joined with `q`.
fn win_qr_link(round: i64, games: &[Vec<u8>]) -> String {
    let encoded = games
        .iter()
        .map(|numbers| {
            numbers
                .iter()
                .map(|n| format!("{n:02}"))
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("q");
    format!("{URL_WINQR}&v={round}q{encoded}")
}

fn format_won(amount: i64) -> String {
    let digits = amount.abs().to_string();
    let mut grouped = String::new();
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if amount < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}
