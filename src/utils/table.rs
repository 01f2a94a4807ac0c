use tabled::builder::Builder;
use tabled::settings::Style;

/// Renders a sharp-style table, or `None` when there are no rows.
pub fn render_table<H, C>(header: &[H], rows: &[Vec<C>]) -> Option<String>
where
    H: AsRef<str>,
    C: AsRef<str>,
{
    if rows.is_empty() {
        return None;
    }
    let mut table_builder = Builder::default();
    table_builder.push_record(header.iter().map(|h| h.as_ref()));
    for row in rows {
        table_builder.push_record(row.iter().map(|cell| cell.as_ref()));
    }
    Some(table_builder.build().with(Style::sharp()).to_string())
}

pub fn print_table<H, C>(header: &[H], rows: &[Vec<C>])
where
    H: AsRef<str>,
    C: AsRef<str>,
{
    if let Some(table) = render_table(header, rows) {
        println!("{}", table);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_rows_render_nothing() {
        let rows: Vec<Vec<String>> = vec![];
        assert!(render_table(&["Index", "Name"], &rows).is_none());
    }

    #[test]
    fn renders_header_and_cells() {
        let table = render_table(&["Index", "Name"], &[vec!["0", "juice-shop"]]).unwrap();
        assert!(table.contains("Index"));
        assert!(table.contains("juice-shop"));
    }
}
