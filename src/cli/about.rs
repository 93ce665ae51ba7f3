use super::ui;

const ABOUT: &str = "\
This dashboard summarises an online retail transaction log.

Each row of the dataset is one invoice line: an item, a quantity, a unit
price, the customer who bought it and the country they bought it from.
Revenue is quantity times unit price, so returns (negative quantities)
reduce it.

The snapshot shows, month by month, the revenue earned, the items sold,
the number of distinct active customers and the average revenue per
invoice. Countries are ranked by revenue, and each month's revenue is
split between new customers (buying in their very first purchase) and
existing ones.

Supply your own file with --file; it must carry at least the Quantity,
InvoiceDate, UnitPrice, CustomerID and Country columns.";

pub fn run(store_name: &str) {
    println!(
        "{}\n",
        ui::style_text(&format!("About {store_name}"), ui::StyleType::Title)
    );
    println!("{ABOUT}");
}
