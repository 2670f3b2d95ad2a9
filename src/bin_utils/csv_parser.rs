use std::io::Read;

use csv::{DeserializeRecordsIntoIter, Trim};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::wallet::WalletId;

/// Operation name that creates a wallet instead of mutating one.
pub const CREATE_OP: &str = "create";

#[derive(Debug, Deserialize)]
pub struct OperationRow {
    /// `create`, or an operation type passed to the processor verbatim.
    pub op: String,
    pub wallet: WalletId,
    #[serde(with = "rust_decimal::serde::str")]
    pub amount: Decimal,
}

/// Parses a list of wallet operations in CSV format
pub struct CsvOperationParser<R> {
    iter: DeserializeRecordsIntoIter<R, OperationRow>,
}

impl<R> CsvOperationParser<R>
where
    R: Read,
{
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(source);

        Self {
            iter: reader.into_deserialize(),
        }
    }
}

impl<R> Iterator for CsvOperationParser<R>
where
    R: Read,
{
    type Item = (u64, csv::Result<OperationRow>);

    fn next(&mut self) -> Option<Self::Item> {
        let curr_line = self.iter.reader().position().line();
        self.iter.next().map(|row| (curr_line, row))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn parse_rows() {
        let input = "op, wallet, amount\n\
                     create, 67e55044-10b1-426f-9247-bb680e5fe0c8, 1000.00\n\
                     DEPOSIT, 67e55044-10b1-426f-9247-bb680e5fe0c8, 0.10\n\
                     WITHDRAW, not-a-uuid, 1\n";
        let rows: Vec<_> = CsvOperationParser::new(input.as_bytes()).collect();
        assert_eq!(rows.len(), 3);

        let (_, row) = &rows[0];
        let row = row.as_ref().unwrap();
        assert_eq!(row.op, CREATE_OP);
        assert_eq!(row.amount, dec!(1000.00));

        let (_, row) = &rows[1];
        assert_eq!(row.as_ref().unwrap().amount, dec!(0.10));

        let (_, row) = &rows[2];
        assert!(row.is_err());
    }
}
