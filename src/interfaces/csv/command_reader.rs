use crate::domain::auth::Role;
use crate::domain::order::OrderLine;
use crate::error::{OrderError, Result};
use crate::interfaces::router::{Command, Request};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum Op {
    Create,
    Cancel,
    Refund,
    Update,
    Get,
    List,
}

/// One row of a command script: `op, user, role, order, items, amount, method`.
#[derive(Debug, Deserialize)]
struct CommandRecord {
    op: Op,
    user: Option<u64>,
    role: Option<Role>,
    order: Option<u64>,
    items: Option<String>,
    amount: Option<Decimal>,
    method: Option<String>,
}

fn required<T>(value: Option<T>, field: &str, op: Op) -> Result<T> {
    value.ok_or_else(|| OrderError::ValidationError(format!("{op:?} requires `{field}`")))
}

/// Parses `product:qty` pairs separated by `|`, e.g. `1:2|4:1`.
fn parse_items(raw: &str) -> Result<Vec<OrderLine>> {
    raw.split('|')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| -> Result<OrderLine> {
            let invalid = || OrderError::ValidationError(format!("Malformed item `{pair}`"));
            let (product, quantity) = pair.split_once(':').ok_or_else(invalid)?;
            Ok(OrderLine::new(
                product.trim().parse().map_err(|_| invalid())?,
                quantity.trim().parse().map_err(|_| invalid())?,
            ))
        })
        .collect()
}

impl TryFrom<CommandRecord> for Request {
    type Error = OrderError;

    fn try_from(record: CommandRecord) -> Result<Self> {
        let op = record.op;
        let command = match op {
            Op::Create => Command::CreateOrder {
                lines: parse_items(&required(record.items, "items", op)?)?,
                payment_method: required(record.method, "method", op)?,
            },
            Op::Cancel => Command::CancelOrder {
                order_id: required(record.order, "order", op)?,
            },
            Op::Refund => Command::RefundOrder {
                order_id: required(record.order, "order", op)?,
                amount: required(record.amount, "amount", op)?,
            },
            Op::Update => Command::UpdateOrderItems {
                order_id: required(record.order, "order", op)?,
                lines: parse_items(&required(record.items, "items", op)?)?,
            },
            Op::Get => Command::GetOrder {
                order_id: required(record.order, "order", op)?,
            },
            Op::List => Command::ListOrders,
        };
        Ok(Request {
            user: record.user,
            role: record.role,
            command,
        })
    }
}

/// Reads order commands from a CSV source.
///
/// Whitespace is trimmed and short rows are accepted, so trailing optional
/// columns may be left off.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    /// Creates a new `CommandReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads and converts each row, yielding an error for rows that do not
    /// parse or lack a field their operation needs.
    pub fn requests(self) -> impl Iterator<Item = Result<Request>> {
        self.reader
            .into_deserialize::<CommandRecord>()
            .map(|record| Request::try_from(record?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const HEADER: &str = "op, user, role, order, items, amount, method\n";

    fn read(rows: &str) -> Vec<Result<Request>> {
        let data = format!("{HEADER}{rows}");
        CommandReader::new(data.as_bytes()).requests().collect()
    }

    #[test]
    fn test_reader_valid_stream() {
        let results = read(
            "create, 1, , , 1:2|2:1, , card\n\
             refund, 9, admin, 1, , 5.5,\n\
             list, 1\n",
        );
        assert_eq!(results.len(), 3);

        let create = results[0].as_ref().unwrap();
        assert_eq!(create.user, Some(1));
        assert_eq!(create.role, None);
        assert_eq!(
            create.command,
            Command::CreateOrder {
                lines: vec![OrderLine::new(1, 2), OrderLine::new(2, 1)],
                payment_method: "card".to_string(),
            }
        );

        let refund = results[1].as_ref().unwrap();
        assert_eq!(refund.role, Some(Role::Admin));
        assert_eq!(
            refund.command,
            Command::RefundOrder {
                order_id: 1,
                amount: dec!(5.5)
            }
        );

        assert_eq!(results[2].as_ref().unwrap().command, Command::ListOrders);
    }

    #[test]
    fn test_reader_malformed_rows() {
        let results = read(
            "explode, 1, , 1, , ,\n\
             cancel, 1, , , , ,\n\
             create, 1, , , 1-2, , card\n",
        );
        assert!(matches!(results[0], Err(OrderError::CsvError(_))));
        assert!(matches!(results[1], Err(OrderError::ValidationError(_))));
        assert!(matches!(results[2], Err(OrderError::ValidationError(_))));
    }
}
