use serde_json::{Map, Value};
use tracing::debug;

use crate::amount::{parse_amount, parse_quantity, AmountLocale};
use crate::models::RawItem;

// ---------------------------------------------------------------------------
// Array-or-mapping collections
// ---------------------------------------------------------------------------

/// A payload collection: a real sequence, a keyed mapping used as a
/// pseudo-array, or nothing. Mapping order is key insertion order, which is
/// not necessarily chronological.
#[derive(Debug, Clone, Copy)]
pub enum Collection<'a> {
    Sequence(&'a [Value]),
    Mapping(&'a Map<String, Value>),
    Absent,
}

impl<'a> Collection<'a> {
    pub fn of(value: Option<&'a Value>) -> Self {
        match value {
            Some(Value::Array(items)) => Collection::Sequence(items),
            Some(Value::Object(map)) => Collection::Mapping(map),
            _ => Collection::Absent,
        }
    }

    /// Entries in iteration order; mapping entries carry their key.
    pub fn entries(&self) -> Vec<(Option<&'a str>, &'a Value)> {
        match *self {
            Collection::Sequence(items) => items.iter().map(|v| (None, v)).collect(),
            Collection::Mapping(map) => map.iter().map(|(k, v)| (Some(k.as_str()), v)).collect(),
            Collection::Absent => Vec::new(),
        }
    }

    pub fn values(&self) -> Vec<&'a Value> {
        self.entries().into_iter().map(|(_, v)| v).collect()
    }
}

// ---------------------------------------------------------------------------
// Field resolution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Code,
    Quantity,
    NetAmount,
    TaxAmount,
    GrossAmount,
    Category,
}

/// Shape of a record in the payload. Each kind has its own candidate keys per field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    OrderItem,
    SaleItem,
    Movement,
    Payment,
}

impl RecordKind {
    /// Alternate keys for `field`, most preferred first.
    pub fn candidates(&self, field: Field) -> &'static [&'static str] {
        match (self, field) {
            (Self::OrderItem | Self::SaleItem, Field::Name) => {
                &["name", "productName", "product", "itemName", "description"]
            }
            (Self::OrderItem | Self::SaleItem, Field::Code) => {
                &["code", "productId", "productID", "sku", "id"]
            }
            (Self::OrderItem | Self::SaleItem, Field::Quantity) => &["quantity", "qty", "cantidad"],
            (Self::OrderItem | Self::SaleItem, Field::NetAmount) => {
                &["netAmount", "netPrice", "net", "subtotal", "total", "price"]
            }
            (Self::OrderItem | Self::SaleItem, Field::TaxAmount) => {
                &["taxAmount", "tax", "taxes", "iva"]
            }
            (Self::OrderItem | Self::SaleItem, Field::GrossAmount) => {
                &["grossAmount", "grossPrice", "gross", "totalWithTax"]
            }
            (Self::OrderItem | Self::SaleItem, Field::Category) => {
                &["category", "categoryName", "hierarchyName", "family"]
            }

            (Self::Movement, Field::Name) => {
                &["description", "name", "concept", "productName", "product"]
            }
            (Self::Movement, Field::Code) => &["code", "movementID", "movementId", "id"],
            (Self::Movement, Field::Quantity) => &["quantity", "qty"],
            (Self::Movement, Field::NetAmount) => &["amount", "netAmount", "net", "total"],
            (Self::Movement, Field::TaxAmount) => &["taxAmount", "tax"],
            (Self::Movement, Field::GrossAmount) => &["grossAmount", "gross"],
            (Self::Movement, Field::Category) => &["category", "categoryName"],

            (Self::Payment, Field::Name) => &["paymentMethod", "name", "method"],
            (Self::Payment, Field::Code) => &["paymentMethodID", "paymentMethodId", "id"],
            (Self::Payment, Field::Quantity) => &["quantity", "count"],
            (Self::Payment, Field::NetAmount) => &["amount", "total"],
            (Self::Payment, Field::TaxAmount) => &["taxAmount", "tax"],
            (Self::Payment, Field::GrossAmount) => &["grossAmount"],
            (Self::Payment, Field::Category) => &["category"],
        }
    }

    /// Quantity used when the record carries none. Sales-by-category rows are
    /// aggregates, so a missing count there means nothing was counted.
    pub fn default_quantity(&self) -> u64 {
        match self {
            Self::SaleItem => 0,
            Self::OrderItem | Self::Movement | Self::Payment => 1,
        }
    }
}

/// First candidate key that is present and not null.
pub fn resolve<'a>(record: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| record.get(*k))
        .find(|v| !v.is_null())
}

pub(crate) fn text_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(decode_escapes(s).trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn build_item(
    record: &Map<String, Value>,
    kind: RecordKind,
    locale: AmountLocale,
    group_category: &str,
) -> RawItem {
    let field = |f: Field| resolve(record, kind.candidates(f));
    // Only scalars count as amounts; `"taxes": []` is no tax figure at all.
    let amount = |f: Field| {
        field(f)
            .filter(|v| v.is_number() || v.is_string())
            .map(|v| parse_amount(Some(v), locale))
    };

    let category = text_of(field(Field::Category))
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| group_category.trim().to_string());

    RawItem {
        name: text_of(field(Field::Name)).unwrap_or_default(),
        code: text_of(field(Field::Code)).unwrap_or_default(),
        quantity: parse_quantity(field(Field::Quantity), locale).unwrap_or(kind.default_quantity()),
        net_amount: amount(Field::NetAmount),
        tax_amount: amount(Field::TaxAmount),
        gross_amount: amount(Field::GrossAmount),
        category,
    }
}

// ---------------------------------------------------------------------------
// Text cleanup
// ---------------------------------------------------------------------------

/// Decodes backslash escapes (`\n`, `\"`, `\u00f1`, ...) and the common HTML
/// entities that leak into upstream product names. Unknown sequences are kept.
pub fn decode_escapes(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let chars: Vec<char> = raw.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' && i + 1 < chars.len() {
            let next = chars[i + 1];
            let simple = match next {
                'n' => Some('\n'),
                't' => Some('\t'),
                'r' => Some('\r'),
                '"' => Some('"'),
                '\'' => Some('\''),
                '\\' => Some('\\'),
                '/' => Some('/'),
                _ => None,
            };
            if let Some(decoded) = simple {
                out.push(decoded);
                i += 2;
                continue;
            }
            if next == 'u' && i + 6 <= chars.len() {
                let hex: String = chars[i + 2..i + 6].iter().collect();
                if let Some(decoded) = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    out.push(decoded);
                    i += 6;
                    continue;
                }
            }
        } else if c == '&' {
            if let Some(end) = chars[i..].iter().take(10).position(|&ch| ch == ';') {
                let entity: String = chars[i + 1..i + end].iter().collect();
                if let Some(decoded) = decode_entity(&entity) {
                    out.push(decoded);
                    i += end + 1;
                    continue;
                }
            }
        }
        out.push(c);
        i += 1;
    }
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let num = entity.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

// ---------------------------------------------------------------------------
// Payload navigation
// ---------------------------------------------------------------------------

const ORDER_ITEM_KEYS: &[&str] = &["products", "items", "detail", "lines"];
const GROUP_ITEM_KEYS: &[&str] = &["items", "products", "sales"];
const GROUP_NAME_KEYS: &[&str] = &["category", "categoryName", "hierarchyName", "name"];
const REGISTER_MARKERS: &[&str] = &[
    "paymentMethods",
    "movements",
    "finalAmount",
    "initialAmount",
    "registerName",
    "resgisterName",
    "closedDate",
];
pub(crate) const CLOSING_AMOUNT_KEYS: &[&str] = &["finalAmount", "closingAmount", "finalBalance"];
// "resgisterName" is how the vendor API spells it.
const CASHIER_KEYS: &[&str] = &[
    "closedBy",
    "closingCashier",
    "cashierClose",
    "closeUser",
    "registerName",
    "resgisterName",
];
const CLOSING_TIME_KEYS: &[&str] = &["closedDate", "closeDate", "closingDate"];

/// Strips the `{ok, data, msg}` API envelope when present.
pub fn unwrap_envelope(payload: &Value) -> &Value {
    match payload {
        Value::Object(map)
            if map.contains_key("data") && (map.contains_key("ok") || map.contains_key("msg")) =>
        {
            &map["data"]
        }
        other => other,
    }
}

/// Shifts of a collection payload with their ids: the `shifts` member, or the
/// payload itself when it is keyed by shift id directly.
pub(crate) fn shift_entries(payload: &Value) -> Vec<(String, &Map<String, Value>)> {
    let container = match payload {
        Value::Object(map) if map.contains_key("shifts") => Collection::of(map.get("shifts")),
        Value::Object(map) => Collection::Mapping(map),
        _ => Collection::Absent,
    };
    container
        .entries()
        .into_iter()
        .enumerate()
        .filter_map(|(i, (key, value))| {
            let id = key.map(str::to_string).unwrap_or_else(|| (i + 1).to_string());
            value.as_object().map(|map| (id, map))
        })
        .collect()
}

fn shifts(payload: &Value) -> Vec<&Map<String, Value>> {
    shift_entries(payload).into_iter().map(|(_, map)| map).collect()
}

/// Register records of a shift, with the register id they were filed under.
pub(crate) fn registers(shift: &Map<String, Value>) -> Vec<(String, &Map<String, Value>)> {
    let mut out = Vec::new();
    for (key, value) in Collection::of(shift.get("registers")).entries() {
        let register_id = key.map(str::to_string).unwrap_or_default();
        match value {
            Value::Object(map) if REGISTER_MARKERS.iter().any(|k| map.contains_key(*k)) => {
                out.push((register_id, map));
            }
            _ => {
                for record in Collection::of(Some(value)).values() {
                    if let Some(map) = record.as_object() {
                        out.push((register_id.clone(), map));
                    }
                }
            }
        }
    }
    out
}

pub(crate) fn objects<'a>(value: Option<&'a Value>) -> Vec<&'a Map<String, Value>> {
    Collection::of(value)
        .values()
        .into_iter()
        .filter_map(Value::as_object)
        .collect()
}

// ---------------------------------------------------------------------------
// Extraction strategies
// ---------------------------------------------------------------------------

/// Result of running the extraction strategies over a payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    pub items: Vec<RawItem>,
    /// Source records the items came from (orders, registers or shifts).
    pub record_count: usize,
    pub strategy: Option<Strategy>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Orders,
    ShiftSales,
    RegisterMovements,
    CollectionPayments,
}

/// Tried in this order; the first one producing items wins.
pub const ALL_STRATEGIES: &[Strategy] = &[
    Strategy::Orders,
    Strategy::ShiftSales,
    Strategy::RegisterMovements,
    Strategy::CollectionPayments,
];

impl Strategy {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Orders => "orders",
            Self::ShiftSales => "shift_sales",
            Self::RegisterMovements => "register_movements",
            Self::CollectionPayments => "collection_payments",
        }
    }

    pub fn extract(&self, payload: &Value, locale: AmountLocale) -> (Vec<RawItem>, usize) {
        match self {
            Self::Orders => extract_orders(payload, locale),
            Self::ShiftSales => extract_shift_sales(payload, locale),
            Self::RegisterMovements => extract_register_movements(payload, locale),
            Self::CollectionPayments => extract_collection_payments(payload, locale),
        }
    }
}

fn extract_orders(payload: &Value, locale: AmountLocale) -> (Vec<RawItem>, usize) {
    let orders = match payload {
        Value::Array(_) => objects(Some(payload)),
        Value::Object(map) => objects(map.get("orders")),
        _ => Vec::new(),
    };
    let mut items = Vec::new();
    for order in &orders {
        match resolve(order, ORDER_ITEM_KEYS) {
            Some(nested) => {
                for item in objects(Some(nested)) {
                    items.push(build_item(item, RecordKind::OrderItem, locale, ""));
                }
            }
            // A flat order line is its own item.
            None if resolve(order, RecordKind::OrderItem.candidates(Field::Name)).is_some() => {
                items.push(build_item(order, RecordKind::OrderItem, locale, ""));
            }
            None => {}
        }
    }
    (items, orders.len())
}

fn extract_shift_sales(payload: &Value, locale: AmountLocale) -> (Vec<RawItem>, usize) {
    let shifts = shifts(payload);
    let mut items = Vec::new();
    for shift in &shifts {
        for (key, group) in Collection::of(shift.get("sales")).entries() {
            let key_category = key.unwrap_or("");
            match group {
                Value::Array(rows) => {
                    for row in rows.iter().filter_map(Value::as_object) {
                        items.push(build_item(row, RecordKind::SaleItem, locale, key_category));
                    }
                }
                Value::Object(map) => match resolve(map, GROUP_ITEM_KEYS) {
                    Some(rows) => {
                        let category = text_of(resolve(map, GROUP_NAME_KEYS))
                            .filter(|c| !c.is_empty())
                            .unwrap_or_else(|| key_category.to_string());
                        for row in objects(Some(rows)) {
                            items.push(build_item(row, RecordKind::SaleItem, locale, &category));
                        }
                    }
                    None => items.push(build_item(map, RecordKind::SaleItem, locale, key_category)),
                },
                _ => {}
            }
        }
    }
    (items, shifts.len())
}

fn extract_register_movements(payload: &Value, locale: AmountLocale) -> (Vec<RawItem>, usize) {
    let mut items = Vec::new();
    let mut register_count = 0;
    for shift in shifts(payload) {
        for (_, register) in registers(shift) {
            register_count += 1;
            for movement in objects(register.get("movements")) {
                items.push(build_item(movement, RecordKind::Movement, locale, ""));
            }
        }
    }
    (items, register_count)
}

fn extract_collection_payments(payload: &Value, locale: AmountLocale) -> (Vec<RawItem>, usize) {
    let mut items = Vec::new();
    let mut register_count = 0;
    for shift in shifts(payload) {
        for (register_id, register) in registers(shift) {
            register_count += 1;
            let payments = objects(register.get("paymentMethods"));
            if payments.is_empty() {
                if let Some(closing) = till_closing(&register_id, register, locale) {
                    items.push(closing);
                }
                continue;
            }
            for payment in payments {
                items.push(build_item(payment, RecordKind::Payment, locale, ""));
            }
        }
    }
    (items, register_count)
}

/// Stand-in item for a register that only reports its closing amount, so its
/// total still reaches the report.
fn till_closing(register_id: &str, register: &Map<String, Value>, locale: AmountLocale) -> Option<RawItem> {
    let amount = parse_amount(resolve(register, CLOSING_AMOUNT_KEYS), locale);
    if amount == 0.0 {
        return None;
    }
    let cashier = text_of(resolve(register, CASHIER_KEYS))
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| "unknown".to_string());
    let date = text_of(resolve(register, CLOSING_TIME_KEYS))
        .map(|raw| closing_date(&raw))
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| "undated".to_string());
    Some(RawItem {
        name: format!("Till closing {cashier} {date}"),
        code: register_id.to_string(),
        quantity: 1,
        net_amount: Some(amount),
        tax_amount: None,
        gross_amount: None,
        category: String::new(),
    })
}

fn closing_date(raw: &str) -> String {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return dt.date_naive().format("%Y-%m-%d").to_string();
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(raw, fmt) {
            return dt.date().format("%Y-%m-%d").to_string();
        }
    }
    if let Ok(d) = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return d.format("%Y-%m-%d").to_string();
    }
    raw.to_string()
}

/// Flattens any supported payload shape into line-item candidates.
/// Never fails: unknown shapes and missing substructures produce no items.
pub fn normalize(payload: &Value, locale: AmountLocale) -> Normalized {
    let payload = unwrap_envelope(payload);
    for strategy in ALL_STRATEGIES {
        let (items, record_count) = strategy.extract(payload, locale);
        debug!(strategy = strategy.key(), items = items.len(), "extraction attempt");
        if !items.is_empty() {
            return Normalized {
                items,
                record_count,
                strategy: Some(*strategy),
            };
        }
    }
    Normalized::default()
}
