use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::amount::{parse_amount, parse_amount_str, AmountLocale};
use crate::error::{PosError, Result};
use crate::export::delimited;
use crate::normalizer::{
    objects, registers, resolve, shift_entries, text_of, unwrap_envelope, RecordKind,
    Field, CLOSING_AMOUNT_KEYS,
};
use crate::reports::share_pct;
use crate::splitter::split_line;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentLine {
    pub method_id: String,
    pub method: String,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegisterSummary {
    pub register_id: String,
    pub register_name: String,
    pub amount: i64,
    pub payments: Vec<PaymentLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShiftSummary {
    pub shift_id: String,
    pub shift_name: String,
    pub total_amount: i64,
    pub registers: Vec<RegisterSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentBreakdown {
    pub method_id: String,
    pub method: String,
    pub amount: i64,
    /// Share of the day's total, two decimals.
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionSummary {
    pub date: NaiveDate,
    pub total_shifts: usize,
    pub total_registers: usize,
    pub total_amount: i64,
    pub payment_methods: Vec<PaymentBreakdown>,
    pub shifts: Vec<ShiftSummary>,
}

const REGISTER_NAME_KEYS: &[&str] = &["registerName", "resgisterName", "name"];

fn summarize_register(
    register_id: String,
    register: &serde_json::Map<String, Value>,
    locale: AmountLocale,
) -> RegisterSummary {
    let payments: Vec<PaymentLine> = objects(register.get("paymentMethods"))
        .into_iter()
        .map(|p| {
            let field = |f: Field| resolve(p, RecordKind::Payment.candidates(f));
            PaymentLine {
                method_id: text_of(field(Field::Code)).unwrap_or_default(),
                method: text_of(field(Field::Name)).unwrap_or_default(),
                amount: parse_amount(field(Field::NetAmount), locale).round() as i64,
            }
        })
        .collect();

    let amount = if payments.is_empty() {
        parse_amount(resolve(register, CLOSING_AMOUNT_KEYS), locale).round() as i64
    } else {
        payments.iter().map(|p| p.amount).sum()
    };

    RegisterSummary {
        register_name: text_of(resolve(register, REGISTER_NAME_KEYS))
            .unwrap_or_else(|| register_id.clone()),
        register_id,
        amount,
        payments,
    }
}

fn round2(val: f64) -> f64 {
    (val * 100.0).round() / 100.0
}

/// Shifts, registers and the consolidated payment methods of one day's
/// collection payload. Methods keep first-seen order.
pub fn summarize(payload: &Value, date: NaiveDate, locale: AmountLocale) -> CollectionSummary {
    let payload = unwrap_envelope(payload);

    let mut shifts = Vec::new();
    for (shift_id, shift) in shift_entries(payload) {
        let registers: Vec<RegisterSummary> = registers(shift)
            .into_iter()
            .map(|(id, reg)| summarize_register(id, reg, locale))
            .collect();
        shifts.push(ShiftSummary {
            shift_name: text_of(shift.get("name")).unwrap_or_else(|| shift_id.clone()),
            shift_id,
            total_amount: registers.iter().map(|r| r.amount).sum(),
            registers,
        });
    }

    let total_amount: i64 = shifts.iter().map(|s| s.total_amount).sum();
    let total_registers = shifts.iter().map(|s| s.registers.len()).sum();

    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut payment_methods: Vec<PaymentBreakdown> = Vec::new();
    for payment in shifts
        .iter()
        .flat_map(|s| &s.registers)
        .flat_map(|r| &r.payments)
    {
        let key = (payment.method_id.clone(), payment.method.clone());
        match index.get(&key) {
            Some(&i) => payment_methods[i].amount += payment.amount,
            None => {
                index.insert(key, payment_methods.len());
                payment_methods.push(PaymentBreakdown {
                    method_id: payment.method_id.clone(),
                    method: payment.method.clone(),
                    amount: payment.amount,
                    percentage: 0.0,
                });
            }
        }
    }
    for pm in &mut payment_methods {
        pm.percentage = round2(share_pct(pm.amount, total_amount));
    }

    info!(
        shifts = shifts.len(),
        registers = total_registers,
        methods = payment_methods.len(),
        total = total_amount,
        "collection summarized"
    );

    CollectionSummary {
        date,
        total_shifts: shifts.len(),
        total_registers,
        total_amount,
        payment_methods,
        shifts,
    }
}

/// One row per payment: `Fecha,Turno,Caja,Método de Pago,Monto`, BOM-prefixed.
pub fn to_csv(summary: &CollectionSummary) -> Result<Vec<u8>> {
    let date = summary.date.format("%Y-%m-%d").to_string();
    let mut rows = vec![vec![
        "Fecha".to_string(),
        "Turno".to_string(),
        "Caja".to_string(),
        "Método de Pago".to_string(),
        "Monto".to_string(),
    ]];
    for shift in &summary.shifts {
        for register in &shift.registers {
            for payment in &register.payments {
                rows.push(vec![
                    date.clone(),
                    shift.shift_name.clone(),
                    register.register_name.clone(),
                    payment.method.clone(),
                    payment.amount.to_string(),
                ]);
            }
        }
    }

    delimited(&rows)
}

// ---------------------------------------------------------------------------
// Uploaded collection CSV
// ---------------------------------------------------------------------------

const NO_METHOD: &str = "Sin especificar";
const NO_SHIFT: &str = "Sin turno";
const NO_REGISTER: &str = "Sin caja";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodTotal {
    pub method: String,
    pub total: i64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotal {
    pub label: String,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvCollectionSummary {
    pub total_records: usize,
    pub grand_total: i64,
    pub by_payment_method: Vec<MethodTotal>,
    pub by_shift: Vec<GroupTotal>,
    #[serde(rename = "byCaja")]
    pub by_register: Vec<GroupTotal>,
}

/// Index of the first header containing any of `needles`.
fn find_column(headers: &[String], needles: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| needles.iter().any(|n| h.contains(n)))
}

fn add_to(groups: &mut Vec<GroupTotal>, index: &mut HashMap<String, usize>, label: &str, amount: i64) {
    match index.get(label) {
        Some(&i) => groups[i].total += amount,
        None => {
            index.insert(label.to_string(), groups.len());
            groups.push(GroupTotal {
                label: label.to_string(),
                total: amount,
            });
        }
    }
}

/// Totals of an uploaded collection CSV by payment method, shift and
/// register. Columns are found by header keywords; methods are sorted by
/// total, largest first, and the other groups keep first-seen order.
pub fn summarize_csv(content: &str, locale: AmountLocale) -> Result<CsvCollectionSummary> {
    let content = content.trim_start_matches('\u{feff}');
    let lines: Vec<&str> = content.split('\n').filter(|l| !l.trim().is_empty()).collect();
    if lines.len() < 2 {
        return Err(PosError::UnknownFormat(
            "CSV is empty or has no data rows".to_string(),
        ));
    }

    let headers: Vec<String> = split_line(lines[0])
        .iter()
        .map(|h| h.replace('"', "").trim().to_lowercase())
        .collect();
    let amount_col = find_column(&headers, &["monto", "amount", "total"]);
    let method_col = find_column(&headers, &["método", "metodo", "pago", "payment"]);
    let shift_col = find_column(&headers, &["turno", "shift"]);
    let register_col = find_column(&headers, &["caja", "register"]);

    let mut grand_total = 0;
    let mut methods = Vec::new();
    let mut shifts = Vec::new();
    let mut registers = Vec::new();
    let (mut method_index, mut shift_index, mut register_index) =
        (HashMap::new(), HashMap::new(), HashMap::new());

    for line in &lines[1..] {
        let fields = split_line(line);
        let get = |col: Option<usize>| {
            col.and_then(|c| fields.get(c))
                .map(|v| v.replace('"', "").trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let amount = get(amount_col)
            .map(|v| parse_amount_str(&v, locale).round() as i64)
            .unwrap_or(0);
        grand_total += amount;

        let method = get(method_col).unwrap_or_else(|| NO_METHOD.to_string());
        add_to(&mut methods, &mut method_index, &method, amount);
        let shift = get(shift_col).unwrap_or_else(|| NO_SHIFT.to_string());
        add_to(&mut shifts, &mut shift_index, &shift, amount);
        let register = get(register_col).unwrap_or_else(|| NO_REGISTER.to_string());
        add_to(&mut registers, &mut register_index, &register, amount);
    }

    let mut by_payment_method: Vec<MethodTotal> = methods
        .into_iter()
        .map(|g| MethodTotal {
            percentage: round2(share_pct(g.total, grand_total)),
            method: g.label,
            total: g.total,
        })
        .collect();
    by_payment_method.sort_by(|a, b| b.total.cmp(&a.total));

    info!(
        records = lines.len() - 1,
        methods = by_payment_method.len(),
        total = grand_total,
        "collection CSV summarized"
    );

    Ok(CsvCollectionSummary {
        total_records: lines.len() - 1,
        grand_total,
        by_payment_method,
        by_shift: shifts,
        by_register: registers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::UTF8_BOM;
    use serde_json::json;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
    }

    fn payload() -> Value {
        json!({"ok": true, "msg": {"texto": "OK"}, "data": {
            "restaurantID": 9,
            "shifts": {
                "1": {"name": "Almuerzo", "registers": {
                    "10": [{"resgisterName": "Caja 1", "finalAmount": 0, "paymentMethods": [
                        {"paymentMethodID": 1, "paymentMethod": "Efectivo ", "amount": "30000,"},
                        {"paymentMethodID": 2, "paymentMethod": "Tarjeta", "amount": 50000}
                    ]}]
                }},
                "2": {"name": "Cena", "registers": {
                    "10": [{"registerName": "Caja 1", "paymentMethods": [
                        {"paymentMethodID": 2, "paymentMethod": "Tarjeta", "amount": 20000}
                    ]}],
                    "11": {"registerName": "Caja 2", "finalAmount": 5000}
                }}
            }
        }})
    }

    #[test]
    fn test_summary_counts_and_totals() {
        let summary = summarize(&payload(), date(), AmountLocale::DotThousands);
        assert_eq!(summary.total_shifts, 2);
        assert_eq!(summary.total_registers, 3);
        assert_eq!(summary.total_amount, 105000);
        assert_eq!(summary.shifts[0].shift_name, "Almuerzo");
        assert_eq!(summary.shifts[0].registers[0].register_name, "Caja 1");
        assert_eq!(summary.shifts[1].registers[1].amount, 5000);
    }

    #[test]
    fn test_payment_methods_consolidated_in_first_seen_order() {
        let summary = summarize(&payload(), date(), AmountLocale::DotThousands);
        let methods: Vec<_> = summary
            .payment_methods
            .iter()
            .map(|m| (m.method.as_str(), m.amount))
            .collect();
        assert_eq!(methods, vec![("Efectivo", 30000), ("Tarjeta", 70000)]);
        assert_eq!(summary.payment_methods[0].percentage, 28.57);
        assert_eq!(summary.payment_methods[1].percentage, 66.67);
    }

    #[test]
    fn test_empty_payload() {
        let summary = summarize(&json!({}), date(), AmountLocale::DotThousands);
        assert_eq!(summary.total_shifts, 0);
        assert_eq!(summary.total_amount, 0);
        assert!(summary.payment_methods.is_empty());
    }

    #[test]
    fn test_zero_total_has_zero_percentages() {
        let body = json!({"shifts": {"1": {"registers": {"1": [{"paymentMethods": [
            {"paymentMethodID": 1, "paymentMethod": "Efectivo", "amount": 0}
        ]}]}}}});
        let summary = summarize(&body, date(), AmountLocale::DotThousands);
        assert_eq!(summary.payment_methods[0].percentage, 0.0);
    }

    #[test]
    fn test_summary_serializes_date() {
        let summary = summarize(&payload(), date(), AmountLocale::DotThousands);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["date"], "2024-03-05");
        assert_eq!(json["payment_methods"][1]["method"], "Tarjeta");
    }

    #[test]
    fn test_csv_export() {
        let summary = summarize(&payload(), date(), AmountLocale::DotThousands);
        let bytes = to_csv(&summary).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Fecha,Turno,Caja,Método de Pago,Monto");
        assert_eq!(lines[1], "2024-03-05,Almuerzo,Caja 1,Efectivo,30000");
        assert_eq!(lines.len(), 4);
    }

    const UPLOAD: &str = "\u{feff}Fecha,Turno,Caja,\"Método de Pago\",Monto\r
2024-03-05,Almuerzo,Caja 1,Efectivo,\"15.000\"\r
2024-03-05,Almuerzo,Caja 2,Tarjeta,40000\r
\r
2024-03-05,Cena,Caja 1,Efectivo,5000\r
2024-03-05,,,,\r
";

    #[test]
    fn test_csv_summary_groups() {
        let summary = summarize_csv(UPLOAD, AmountLocale::DotThousands).unwrap();
        assert_eq!(summary.total_records, 4);
        assert_eq!(summary.grand_total, 60000);

        let methods: Vec<_> = summary
            .by_payment_method
            .iter()
            .map(|m| (m.method.as_str(), m.total, m.percentage))
            .collect();
        assert_eq!(
            methods,
            vec![
                ("Tarjeta", 40000, 66.67),
                ("Efectivo", 20000, 33.33),
                ("Sin especificar", 0, 0.0)
            ]
        );

        let shifts: Vec<_> = summary.by_shift.iter().map(|g| (g.label.as_str(), g.total)).collect();
        assert_eq!(shifts, vec![("Almuerzo", 55000), ("Cena", 5000), ("Sin turno", 0)]);
        let registers: Vec<_> = summary.by_register.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(registers, vec!["Caja 1", "Caja 2", "Sin caja"]);
    }

    #[test]
    fn test_csv_summary_header_keywords() {
        let content = "ID,Payment Type,Shift Name,Register,Total Amount\n1,Cash,AM,R1,100\n";
        let summary = summarize_csv(content, AmountLocale::Plain).unwrap();
        assert_eq!(summary.by_payment_method[0].method, "Cash");
        assert_eq!(summary.by_payment_method[0].percentage, 100.0);
        assert_eq!(summary.by_shift[0].label, "AM");
        assert_eq!(summary.by_register[0].label, "R1");
        assert_eq!(summary.grand_total, 100);
    }

    #[test]
    fn test_csv_summary_without_known_columns() {
        let summary = summarize_csv("a,b\nx,y\n", AmountLocale::DotThousands).unwrap();
        assert_eq!(summary.grand_total, 0);
        assert_eq!(summary.by_payment_method[0].method, "Sin especificar");
        assert_eq!(summary.by_payment_method[0].percentage, 0.0);
    }

    #[test]
    fn test_csv_summary_needs_data_rows() {
        for content in ["", "\n\n", "Turno,Monto\n", "\u{feff}Turno,Monto\n  \n"] {
            assert!(matches!(
                summarize_csv(content, AmountLocale::DotThousands),
                Err(PosError::UnknownFormat(_))
            ));
        }
    }

    #[test]
    fn test_csv_summary_serializes_upload_keys() {
        let summary = summarize_csv(UPLOAD, AmountLocale::DotThousands).unwrap();
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["totalRecords"], 4);
        assert_eq!(json["grandTotal"], 60000);
        assert_eq!(json["byPaymentMethod"][0]["method"], "Tarjeta");
        assert_eq!(json["byCaja"][1]["label"], "Caja 2");
    }
}
