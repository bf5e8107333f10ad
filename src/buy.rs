use tracing::{debug, info};

use crate::client::{LottoClient, bare_client};
use crate::config::{Config, MAX_GAME_COUNT, URL_BUY, URL_GAME_PAGE, URL_USER_READY};
use crate::error::{LottoError, RejectReason, Result};
use crate::generate;
use crate::scrape;
use crate::store::Store;
use crate::types::{BuyResponse, BuyResult, GameChoice, GenType, PurchaseReceipt};

pub const GAME_PRICE: i64 = 1000;

const BUY_SUCCESS_CODE: &str = "100";

const EMPTY_RESULT_MESSAGE: &str = "result message is empty";

/// One purchase transaction, strictly sequential: warm-up, selections,
/// balance, round, ready token, buy, interpretation. Any failing step
/// aborts the rest; nothing is retried.
pub async fn buy(client: &LottoClient, config: &Config, store: &Store) -> Result<PurchaseReceipt> {
    if config.game_count < 1 || config.game_count > MAX_GAME_COUNT {
        return Err(LottoError::GameCount(config.game_count));
    }
    let game_count = config.game_count as usize;

    // Session continuity only; the page body is not consumed.
    client.get(URL_GAME_PAGE).await?;

    let selections = build_selections(config);

    let balance = scrape::fetch_balance(client).await?;
    let last_round = scrape::fetch_last_round(client).await?;
    let buy_round = last_round.round + 1;
    info!("buying round {buy_round}, balance {balance}");

    let ready_token = fetch_ready_token().await?;

    let amount = GAME_PRICE * game_count as i64;
    let form = [
        ("round", buy_round.to_string()),
        ("direct", ready_token),
        ("nBuyAmount", amount.to_string()),
        ("param", serde_json::to_string(&selections)?),
        ("gameCnt", game_count.to_string()),
    ];
    debug!("buy request: round={buy_round} amount={amount} games={game_count}");

    let response = client.post_form(URL_BUY, &form).await?.ensure_ok()?;
    let body: BuyResponse = match response.json {
        Some(value) => serde_json::from_value(value)?,
        None => serde_json::from_str(&response.text)
            .map_err(|_| LottoError::Parse("buy response is not JSON".to_string()))?,
    };

    let result = interpret_buy_response(body).map_err(LottoError::Buy)?;
    let receipt = settle(result, buy_round, amount, balance);

    store.record_purchase(receipt.round, &receipt.numbers)?;
    Ok(receipt)
}

fn build_selections(config: &Config) -> Vec<GameChoice> {
    (0..config.game_count as usize)
        .map(|slot| {
            let numbers = (config.gen_type == GenType::Manual).then(|| {
                generate::generate_numbers(&config.pinned[slot])
                    .iter()
                    .map(u8::to_string)
                    .collect::<Vec<_>>()
                    .join(",")
            });
            GameChoice {
                gen_type: config.gen_type.wire_code(&config.auto_code),
                arr_game_choice_num: numbers,
                alpabet: slot_letter(slot),
            }
        })
        .collect()
}

fn slot_letter(slot: usize) -> String {
    char::from(b'A' + slot as u8).to_string()
}

/// The buy reply carries several independent verdicts; the first tripped
/// one wins, and only then does the nested result code count.
fn interpret_buy_response(body: BuyResponse) -> std::result::Result<BuyResult, RejectReason> {
    if body.login_yn.as_deref() == Some("N") {
        return Err(RejectReason::AuthExpired);
    }
    if body.is_allowed.as_deref() == Some("N") {
        return Err(RejectReason::Blocked);
    }
    if body.is_game_managed.as_deref() == Some("Y") {
        let reason = body
            .error_msg
            .filter(|msg| !msg.trim().is_empty())
            .unwrap_or_else(|| "no reason given".to_string());
        return Err(RejectReason::GameManaged(reason));
    }
    if body.check_olt_sale_time == Some(true) {
        return Err(RejectReason::OutsideSaleWindow);
    }

    let result = body
        .result
        .ok_or_else(|| RejectReason::Rejected(EMPTY_RESULT_MESSAGE.to_string()))?;
    if result.result_code != BUY_SUCCESS_CODE {
        let message = if result.result_msg.trim().is_empty() {
            EMPTY_RESULT_MESSAGE.to_string()
        } else {
            result.result_msg.clone()
        };
        return Err(RejectReason::Rejected(message));
    }
    Ok(result)
}

fn settle(result: BuyResult, requested_round: i64, requested_amount: i64, balance: i64) -> PurchaseReceipt {
    let round = if result.buy_round > 0 {
        result.buy_round
    } else {
        requested_round
    };
    let charged = if result.n_buy_amount > 0 {
        result.n_buy_amount
    } else {
        requested_amount
    };
    let (remaining, low_balance) = remaining_after(balance, charged);
    let numbers = result
        .arr_game_choice_num
        .iter()
        .map(|line| parse_choice_line(line))
        .collect();

    PurchaseReceipt {
        round,
        amount: charged,
        bar_codes: [
            result.bar_code1,
            result.bar_code2,
            result.bar_code3,
            result.bar_code4,
            result.bar_code5,
            result.bar_code6,
        ],
        games: result.arr_game_choice_num,
        numbers,
        remaining,
        low_balance,
        result_msg: result.result_msg,
    }
}

/// Warn when the deposit left cannot cover another purchase of this size.
fn remaining_after(balance: i64, charged: i64) -> (i64, bool) {
    let remaining = balance - charged;
    (remaining, remaining < charged)
}

/// Ticket lines come back as `A|03|07|15|22|30|41` with a trailing gen-type
/// digit glued on; strip it, then pull out the six numbers.
fn parse_choice_line(line: &str) -> Vec<u8> {
    let trimmed = line.get(..line.len().saturating_sub(1)).unwrap_or(line);
    trimmed
        .split(|c: char| !c.is_ascii_digit())
        .filter(|token| !token.is_empty())
        .filter_map(|token| token.parse().ok())
        .collect()
}

/// The ready endpoint is unauthenticated and must not see the session's
/// cookies, so it gets a one-off client.
async fn fetch_ready_token() -> Result<String> {
    let client = bare_client()?;
    let ready: crate::types::UserReady = client
        .post(URL_USER_READY)
        .send()
        .await?
        .json()
        .await?;
    debug!(
        "ready token issued at {:?} (cnt {:?}, direct {:?})",
        ready.ready_time, ready.ready_cnt, ready.direct_yn
    );
    Ok(ready.ready_ip)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::Schedule;
    use serde_json::json;

    fn test_config(game_count: u8, gen_type: GenType) -> Config {
        Config {
            user_id: "user".to_string(),
            user_pw: "pw".to_string(),
            game_count,
            gen_type,
            auto_code: "0".to_string(),
            pinned: [
                vec![3, 7, 15, 22, 30, 41],
                vec![],
                vec![],
                vec![],
                vec![],
            ],
            telegram: None,
            database_url: ":memory:".to_string(),
            buy_schedule: Schedule::parse("Sat 13:00").unwrap(),
            check_schedule: Schedule::parse("Sat 21:30").unwrap(),
        }
    }

    fn success_body(amount: i64) -> BuyResponse {
        serde_json::from_value(json!({
            "loginYn": "Y",
            "result": {
                "buyRound": "1101",
                "barCode1": "11111", "barCode2": "22222", "barCode3": "33333",
                "barCode4": "44444", "barCode5": "55555", "barCode6": "66666",
                "nBuyAmount": amount,
                "arrGameChoiceNum": ["A|03|07|15|22|30|413"],
                "resultCode": "100",
                "resultMsg": "SUCCESS"
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn out_of_range_game_count_fails_before_any_request() {
        let client = LottoClient::new().unwrap();
        let store = Store::open_in_memory().unwrap();
        let config = test_config(6, GenType::Auto);
        assert!(matches!(
            buy(&client, &config, &store).await,
            Err(LottoError::GameCount(6))
        ));
    }

    #[test]
    fn manual_selections_carry_numbers_and_amount_matches() {
        let config = test_config(3, GenType::Manual);
        let selections = build_selections(&config);
        assert_eq!(selections.len(), 3);
        assert_eq!(GAME_PRICE * selections.len() as i64, 3000);
        assert_eq!(
            selections[0].arr_game_choice_num.as_deref(),
            Some("3,7,15,22,30,41")
        );
        assert_eq!(selections[0].alpabet, "A");
        assert_eq!(selections[2].alpabet, "C");
        assert!(selections.iter().all(|choice| choice.gen_type == "1"));
    }

    #[test]
    fn auto_selections_have_no_numbers() {
        let config = test_config(5, GenType::Auto);
        let selections = build_selections(&config);
        assert_eq!(selections.len(), 5);
        assert!(selections.iter().all(|choice| choice.arr_game_choice_num.is_none()));
        assert!(selections.iter().all(|choice| choice.gen_type == "0"));
    }

    #[test]
    fn logged_out_flag_beats_a_successful_result() {
        let mut body = success_body(1000);
        body.login_yn = Some("N".to_string());
        assert_eq!(
            interpret_buy_response(body).unwrap_err(),
            RejectReason::AuthExpired
        );
    }

    #[test]
    fn flags_are_checked_in_priority_order() {
        let body = BuyResponse {
            login_yn: Some("N".to_string()),
            is_allowed: Some("N".to_string()),
            is_game_managed: Some("Y".to_string()),
            check_olt_sale_time: Some(true),
            ..Default::default()
        };
        assert_eq!(
            interpret_buy_response(body).unwrap_err(),
            RejectReason::AuthExpired
        );

        let body = BuyResponse {
            is_allowed: Some("N".to_string()),
            is_game_managed: Some("Y".to_string()),
            ..Default::default()
        };
        assert_eq!(
            interpret_buy_response(body).unwrap_err(),
            RejectReason::Blocked
        );

        let body = BuyResponse {
            is_game_managed: Some("Y".to_string()),
            error_msg: Some("추첨 준비중".to_string()),
            check_olt_sale_time: Some(true),
            ..Default::default()
        };
        assert_eq!(
            interpret_buy_response(body).unwrap_err(),
            RejectReason::GameManaged("추첨 준비중".to_string())
        );

        let body = BuyResponse {
            check_olt_sale_time: Some(true),
            ..Default::default()
        };
        assert_eq!(
            interpret_buy_response(body).unwrap_err(),
            RejectReason::OutsideSaleWindow
        );
    }

    #[test]
    fn non_success_result_code_is_rejected_with_server_text() {
        let body: BuyResponse = serde_json::from_value(json!({
            "result": {"resultCode": "300", "resultMsg": "예치금이 부족합니다."}
        }))
        .unwrap();
        assert_eq!(
            interpret_buy_response(body).unwrap_err(),
            RejectReason::Rejected("예치금이 부족합니다.".to_string())
        );

        let body: BuyResponse = serde_json::from_value(json!({
            "result": {"resultCode": "300"}
        }))
        .unwrap();
        assert_eq!(
            interpret_buy_response(body).unwrap_err(),
            RejectReason::Rejected(EMPTY_RESULT_MESSAGE.to_string())
        );
    }

    #[test]
    fn missing_result_object_is_rejected() {
        assert!(matches!(
            interpret_buy_response(BuyResponse::default()),
            Err(RejectReason::Rejected(_))
        ));
    }

    #[test]
    fn settle_computes_remaining_and_low_balance() {
        let body = success_body(3000);
        let result = interpret_buy_response(body).unwrap();
        let receipt = settle(result, 1101, 3000, 50_000);
        assert_eq!(receipt.round, 1101);
        assert_eq!(receipt.amount, 3000);
        assert_eq!(receipt.remaining, 47_000);
        assert!(!receipt.low_balance);
        assert_eq!(receipt.numbers, vec![vec![3, 7, 15, 22, 30, 41]]);
        assert_eq!(receipt.bar_codes[0], "11111");
    }

    #[test]
    fn low_balance_flags_when_another_buy_will_not_fit() {
        let (remaining, low) = remaining_after(5000, 3000);
        assert_eq!(remaining, 2000);
        assert!(low);

        let (remaining, low) = remaining_after(50_000, 3000);
        assert_eq!(remaining, 47_000);
        assert!(!low);
    }

    #[test]
    fn choice_lines_drop_the_gen_type_marker() {
        assert_eq!(
            parse_choice_line("A|03|07|15|22|30|413"),
            vec![3, 7, 15, 22, 30, 41]
        );
        assert_eq!(parse_choice_line(""), Vec::<u8>::new());
    }
}
