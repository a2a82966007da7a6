//! Schema command - print expected input formats

use crate::ledger::{CsvField, ExchangeRate, LedgerFile, SecurityPrice, Transaction};
use clap::Args;
use schemars::schema_for;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// Output format: json-schema or csv-header
    #[arg(value_enum, default_value = "json-schema")]
    format: SchemaFormat,

    /// CSV stream described by the csv-* formats
    #[arg(value_enum, default_value = "transactions")]
    stream: CsvStream,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaFormat {
    /// JSON Schema for the ledger file
    JsonSchema,
    /// CSV header row with column names
    CsvHeader,
    /// CSV column descriptions
    CsvFields,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CsvStream {
    /// Transaction records (--transactions)
    Transactions,
    /// Security prices (--prices)
    Prices,
    /// Exchange rates (--rates)
    Rates,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        match self.format {
            SchemaFormat::JsonSchema => self.print_json_schema()?,
            SchemaFormat::CsvHeader => self.print_csv_header(),
            SchemaFormat::CsvFields => self.print_csv_fields(),
        }
        Ok(())
    }

    fn fields(&self) -> &'static [CsvField] {
        match self.stream {
            CsvStream::Transactions => Transaction::csv_schema(),
            CsvStream::Prices => SecurityPrice::csv_schema(),
            CsvStream::Rates => ExchangeRate::csv_schema(),
        }
    }

    fn print_json_schema(&self) -> anyhow::Result<()> {
        let schema = schema_for!(LedgerFile);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        Ok(())
    }

    fn print_csv_header(&self) {
        let names: Vec<&str> = self.fields().iter().map(|f| f.name).collect();
        println!("{}", names.join(","));
    }

    fn print_csv_fields(&self) {
        println!("CSV Input Format");
        println!("================");
        println!();
        for field in self.fields() {
            let req = if field.required { "required" } else { "optional" };
            println!(
                "{:20} {:8} ({:8})  {}",
                field.name, field.kind, req, field.description
            );
        }
        println!();
        println!("Owner references: account or payee name, or portfolio:security for holdings");
    }
}
