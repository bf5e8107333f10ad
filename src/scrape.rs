use scraper::{Html, Selector};
use serde_json::Value;

use crate::client::LottoClient;
use crate::config::{URL_ALL_RESULTS, URL_MAIN_INFO, URL_MYPAGE};
use crate::error::{LottoError, Result};
use crate::types::RoundInfo;

/// The results page refuses wider pages, so the client refuses first.
pub const MAX_RESULT_SPAN: i64 = 20;

const WINNING_NUMBER_KEYS: [&str; 6] = [
    "tm1WnNo", "tm2WnNo", "tm3WnNo", "tm4WnNo", "tm5WnNo", "tm6WnNo",
];

/// Login pages carry the portal's big blue login button; its absence after
/// a credential submit means the session is live.
const LOGIN_PROMPT_SELECTOR: &str = "a.btn_common.lrg.blu";

const PWD_CHANGE_FORM_SELECTOR: &str = "form[name=frmPwdChange]";

/// Latest drawn round from the main-info payload: the record with the
/// highest episode number wins, whatever order the list arrives in.
pub fn extract_last_round(payload: &Value) -> Result<RoundInfo> {
    let records = payload
        .pointer("/data/result/pstLtEpstInfo/lt645")
        .and_then(Value::as_array)
        .ok_or_else(|| LottoError::Parse("main info carries no lt645 records".to_string()))?;

    let best = records
        .iter()
        .max_by_key(|record| record.get("ltEpsd").and_then(Value::as_i64).unwrap_or(i64::MIN))
        .ok_or_else(|| LottoError::Parse("main info record list is empty".to_string()))?;

    round_from_record(best)
}

fn round_from_record(record: &Value) -> Result<RoundInfo> {
    let round = record
        .get("ltEpsd")
        .and_then(Value::as_i64)
        .ok_or_else(|| LottoError::Parse("draw record has no episode number".to_string()))?;
    let date = record
        .get("ltRflYmd")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let mut numbers = [0u8; 6];
    for (slot, key) in WINNING_NUMBER_KEYS.iter().enumerate() {
        numbers[slot] = record
            .get(*key)
            .and_then(Value::as_u64)
            .ok_or_else(|| LottoError::Parse(format!("draw record is missing {key}")))?
            as u8;
    }
    let bonus_no = record
        .get("bnsWnNo")
        .and_then(Value::as_u64)
        .ok_or_else(|| LottoError::Parse("draw record is missing bnsWnNo".to_string()))?
        as u8;

    Ok(RoundInfo {
        round,
        date,
        numbers,
        bonus_no,
    })
}

/// Deposit balance from the my-page payload. A missing field means no
/// deposit, not an error.
pub fn extract_balance(payload: &Value) -> i64 {
    payload
        .pointer("/data/userMndp/crntEntrsAmt")
        .and_then(Value::as_i64)
        .unwrap_or(0)
}

pub fn check_result_range(start: i64, end: i64) -> Result<()> {
    if start > end || end - start > MAX_RESULT_SPAN {
        return Err(LottoError::InvalidRange { start, end });
    }
    Ok(())
}

/// Rows of the all-results print table, in document order. Header rows and
/// anything else that does not parse as a draw row are skipped.
pub fn extract_historical_results(html: &str) -> Vec<RoundInfo> {
    let document = Html::parse_document(html);
    let row_selector = Selector::parse("table tr").unwrap();
    let cell_selector = Selector::parse("td").unwrap();

    let mut rounds = Vec::new();
    for row in document.select(&row_selector) {
        let cells: Vec<String> = row
            .select(&cell_selector)
            .map(|cell| cell.text().collect::<String>().trim().to_string())
            .collect();
        if let Some(round) = round_from_cells(&cells) {
            rounds.push(round);
        }
    }
    rounds
}

// Column order on the print page: round, draw date, six winning numbers,
// bonus number, then prize columns we do not read.
fn round_from_cells(cells: &[String]) -> Option<RoundInfo> {
    if cells.len() < 9 {
        return None;
    }
    let round = cells[0].parse().ok()?;
    let mut numbers = [0u8; 6];
    for (slot, cell) in cells[2..8].iter().enumerate() {
        numbers[slot] = cell.parse().ok()?;
    }
    Some(RoundInfo {
        round,
        date: cells[1].clone(),
        numbers,
        bonus_no: cells[8].parse().ok()?,
    })
}

pub async fn fetch_last_round(client: &LottoClient) -> Result<RoundInfo> {
    let response = client.get(URL_MAIN_INFO).await?.ensure_ok()?;
    let payload = response
        .json
        .ok_or_else(|| LottoError::Parse("main info response is not JSON".to_string()))?;
    extract_last_round(&payload)
}

pub async fn fetch_balance(client: &LottoClient) -> Result<i64> {
    let response = client.get(URL_MYPAGE).await?.ensure_ok()?;
    Ok(response.json.as_ref().map(extract_balance).unwrap_or(0))
}

/// Range check happens before the request goes out; the portal caps result
/// pages at 20 rounds.
pub async fn fetch_historical_results(
    client: &LottoClient,
    start: i64,
    end: i64,
) -> Result<Vec<RoundInfo>> {
    check_result_range(start, end)?;
    let url = format!("{URL_ALL_RESULTS}&drwNoStart={start}&drwNoEnd={end}");
    let response = client.get(&url).await?.ensure_ok()?;
    Ok(extract_historical_results(&response.text))
}

pub fn has_login_prompt(html: &str) -> bool {
    let document = Html::parse_document(html);
    let selector = Selector::parse(LOGIN_PROMPT_SELECTOR).unwrap();
    document.select(&selector).next().is_some()
}

/// Hidden fields of the forced-password-change form, in document order, or
/// `None` when the page has no such form. Values are reposted verbatim.
pub fn password_change_form_fields(html: &str) -> Option<Vec<(String, String)>> {
    let document = Html::parse_document(html);
    let form_selector = Selector::parse(PWD_CHANGE_FORM_SELECTOR).unwrap();
    let hidden_selector = Selector::parse("input[type=hidden]").unwrap();

    let form = document.select(&form_selector).next()?;
    Some(
        form.select(&hidden_selector)
            .filter_map(|input| {
                let element = input.value();
                let name = element.attr("name")?;
                Some((
                    name.to_string(),
                    element.attr("value").unwrap_or_default().to_string(),
                ))
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn draw_record(episode: i64, first: u8) -> Value {
        json!({
            "ltEpsd": episode,
            "ltRflYmd": "20260801",
            "tm1WnNo": first, "tm2WnNo": 12, "tm3WnNo": 18,
            "tm4WnNo": 24, "tm5WnNo": 31, "tm6WnNo": 42,
            "bnsWnNo": 7
        })
    }

    #[test]
    fn last_round_picks_the_highest_episode() {
        let payload = json!({"data": {"result": {"pstLtEpstInfo": {"lt645": [
            draw_record(101, 1),
            draw_record(103, 3),
            draw_record(102, 2),
        ]}}}});
        let round = extract_last_round(&payload).unwrap();
        assert_eq!(round.round, 103);
        assert_eq!(round.numbers, [3, 12, 18, 24, 31, 42]);
        assert_eq!(round.bonus_no, 7);
    }

    #[test]
    fn empty_record_list_is_a_parse_error() {
        let payload = json!({"data": {"result": {"pstLtEpstInfo": {"lt645": []}}}});
        assert!(matches!(
            extract_last_round(&payload),
            Err(LottoError::Parse(_))
        ));
    }

    #[test]
    fn balance_reads_the_nested_field() {
        let payload = json!({"data": {"userMndp": {"crntEntrsAmt": 12345}}});
        assert_eq!(extract_balance(&payload), 12345);
    }

    #[test]
    fn missing_balance_field_is_zero() {
        assert_eq!(extract_balance(&json!({"data": {}})), 0);
        assert_eq!(extract_balance(&json!({})), 0);
    }

    #[test]
    fn too_wide_result_range_is_rejected() {
        assert!(matches!(
            check_result_range(200, 225),
            Err(LottoError::InvalidRange {
                start: 200,
                end: 225
            })
        ));
        assert!(check_result_range(200, 220).is_ok());
        assert!(check_result_range(210, 200).is_err());
    }

    #[test]
    fn historical_rows_parse_in_document_order() {
        let html = r#"<table>
            <tr><th>round</th><th>date</th></tr>
            <tr><td>1099</td><td>2026-07-25</td><td>2</td><td>9</td><td>16</td>
                <td>25</td><td>33</td><td>40</td><td>11</td><td>2,000,000,000</td></tr>
            <tr><td>1100</td><td>2026-08-01</td><td>5</td><td>11</td><td>19</td>
                <td>27</td><td>36</td><td>44</td><td>3</td><td>1,800,000,000</td></tr>
        </table>"#;
        let rounds = extract_historical_results(html);
        assert_eq!(rounds.len(), 2);
        assert_eq!(rounds[0].round, 1099);
        assert_eq!(rounds[1].numbers, [5, 11, 19, 27, 36, 44]);
        assert_eq!(rounds[1].bonus_no, 3);
    }

    #[test]
    fn login_prompt_detection_uses_the_portal_button() {
        let prompt = r##"<a class="btn_common lrg blu" href="#">로그인</a>"##;
        assert!(has_login_prompt(prompt));
        assert!(!has_login_prompt("<p>환영합니다</p>"));
    }

    #[test]
    fn password_change_hidden_fields_are_collected() {
        let html = r#"
            <form name="frmPwdChange" method="post">
                <input type="hidden" name="token" value="abc123">
                <input type="hidden" name="userSn" value="42">
                <input type="password" name="newPw" value="">
            </form>"#;
        let fields = password_change_form_fields(html).unwrap();
        assert_eq!(
            fields,
            vec![
                ("token".to_string(), "abc123".to_string()),
                ("userSn".to_string(), "42".to_string()),
            ]
        );
    }

    #[test]
    fn pages_without_the_form_yield_none() {
        assert!(password_change_form_fields("<html><body>main</body></html>").is_none());
    }
}
