//! Basic calexpand walkthrough: parse, describe, generate, expand.

use calexpand::{describe, ExceptionRecord, Expander, MasterRecord, RecurrenceRange, TimezoneBias};
use jiff::civil::date;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let description = r#"<recurrence><rule><firstDayOfWeek>su</firstDayOfWeek>
        <repeat><weekly mo="TRUE" we="TRUE" weekFrequency="2" /></repeat>
        <repeatInstances>10</repeatInstances></rule></recurrence>"#;
    let start = date(2026, 3, 2).at(9, 0, 0, 0);
    let end = date(2026, 3, 2).at(10, 0, 0, 0);

    // Parse the recurrence rule
    let (pattern, range) = calexpand::parse(description, start)?;
    println!("Rule: {}", describe(&pattern, &range));

    // Walk the raw series lazily
    println!("\nFirst 3 scheduled occurrences:");
    for occ in calexpand::generate(start, end, &pattern, &RecurrenceRange::NoEnd).take(3) {
        println!("  {} - {}", occ.start, occ.end);
    }

    // Expand with one cancelled and one moved occurrence, one hour east of
    // UTC with summer time
    let masters = [
        MasterRecord::recurring(1, start, end, description),
        MasterRecord::single(2, date(2026, 3, 20).at(12, 0, 0, 0), date(2026, 3, 20).at(13, 0, 0, 0)),
    ];
    let exceptions = [
        ExceptionRecord::deleted(1, date(2026, 3, 4).at(9, 0, 0, 0)),
        ExceptionRecord::replaced(
            1,
            date(2026, 3, 16).at(9, 0, 0, 0),
            date(2026, 3, 17).at(15, 0, 0, 0),
            date(2026, 3, 17).at(16, 0, 0, 0),
        ),
    ];
    let expansion = Expander::new(TimezoneBias::new(-60, -60)).expand(&masters, &exceptions);

    println!("\nId Start End");
    for instance in &expansion.instances {
        println!("{} {} {}", instance.id(), instance.start(), instance.end());
    }
    for warning in &expansion.warnings {
        println!("warning: {warning}");
    }

    Ok(())
}
