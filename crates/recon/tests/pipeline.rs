use txnmis_recon::config::MisConfig;
use txnmis_recon::engine::{run, RunOutputs, StagedInputs};
use txnmis_recon::{MisError, Sheet, Table, Value, Workbook};

fn t(s: &str) -> Value {
    Value::text(s)
}

fn n(x: f64) -> Value {
    Value::Number(x)
}

fn row(cells: &[&str]) -> Vec<Value> {
    cells.iter().map(|c| t(c)).collect()
}

fn table(name: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> Table {
    let mut table = Table::new(name, columns.iter().map(|c| c.to_string()).collect());
    for r in rows {
        table.push_row(r);
    }
    table
}

fn master_workbook() -> Workbook {
    let client_master = table(
        "Client Master",
        &[
            "CLIENTID", "CLIENTNAME", "CLIENTCODE", "PANNUMBER", "GROUPNAME", "RELMGRNAME", "BILLGROUP", "Region",
        ],
        vec![row(&["1", "Asha Rao", "C001", "AAAPA1234A", "Rao Family", "Neha Iyer", "B1", "West"])],
    );
    let mut scheme_master = table(
        "Scheme Master",
        &[
            "SYMBOLID",
            "Scheme name",
            "ISIN",
            "Symbolcode5",
            "DIMNAME15 Old",
            "ASTCLSNAME",
            "DIMNAME13",
            "New Product",
            "New Asset-class",
            "New Manufacturer",
        ],
        vec![row(&[
            "S1", "Alpha Fund", "INF001", "A5", "Alpha AMC", "Equity", "Large Cap", "MF", "Equity", "Alpha AMC",
        ])],
    );
    scheme_master.preamble = vec![row(&["Scheme Master - maintained by ops"])];

    let ambit_first = table("Ambit First", &["ClientCode"], vec![row(&["ND900"])]);
    let trnx_type = table(
        "Trnx Type Update",
        &["Tran Desc", "Consider", "Delete"],
        vec![
            row(&["Purchase", "Purchase", ""]),
            row(&["Redemption", "Redemption", ""]),
            row(&["InFlow", "Switch In", ""]),
            row(&["Charges", "Charges", "Charges"]),
        ],
    );
    let employee = table(
        "Employee Mapping Master",
        &["RM Name", "Banker Name", "Banker Group", "Banker Tag"],
        vec![row(&["Neha Iyer", "Ravi Kumar", "West Desk", "Senior"])],
    );
    let ntb = table(
        "NTB Data",
        &["Family Group", "NTB Month", "NTB FY"],
        vec![row(&["Shah Family", "Apr-2024", "FY25"])],
    );

    Workbook::new(vec![
        Sheet::new("Read Me", vec![row(&["Do not edit column headers"])]),
        client_master.to_sheet("Client Master"),
        scheme_master.to_sheet("Scheme Master"),
        ambit_first.to_sheet("Ambit First"),
        trnx_type.to_sheet("Trnx Type Update"),
        employee.to_sheet("Employee Mapping Master"),
        ntb.to_sheet("NTB Data"),
    ])
}

fn reference_clients() -> Table {
    table(
        "Clients",
        &["CLIENTID", "CLIENTNAME", "CLIENTCODE", "PANNUMBER", "GROUPNAME", "RELMGRNAME", "BILLGROUP"],
        vec![
            row(&["1", "Asha Rao", "c001", "AAAPA1234A", "Rao Family", "Neha Iyer", "B1"]),
            row(&["2", "Vikram Shah", "C100", "BBBPB5678B", "Shah Family", "Neha Iyer", "B2"]),
        ],
    )
}

fn reference_schemes() -> Table {
    table(
        "Schemes",
        &["SYMBOLID", "SYMBOLNAME", "ISINCODE", "REFSYMBOL5", "DIMNAME15", "ASTCLSNAME", "DIMNAME13"],
        vec![
            row(&["S1", "Alpha Fund", "INF001", "A5", "Alpha AMC", "Equity", "Large Cap"]),
            row(&["S2", "Beta Fund", "INF002", "B5", "Beta AMC", "Debt", "Liquid"]),
        ],
    )
}

fn transactions() -> Table {
    let tx = |account: Value, security: &str, trf: f64, net: f64, desc: &str, memo: &str, client: &str| {
        vec![account, t(security), n(trf), n(net), t(desc), t(memo), t(client)]
    };
    table(
        "Extract",
        &["WS Account Code", "Security Code", "TrfAmt", "Net Amount", "Tran Desc", "Memo", "Client Name"],
        vec![
            tx(t("C001"), "S1", 50_000_000.0, 0.0, "Purchase", "", "Asha Rao"),
            tx(t("C001"), "S1", 0.0, 50_000_000.0, "Redemption", "", "Asha Rao"),
            tx(t("C100"), "S2", 1000.0, 0.0, "InFlow", "Broker Change", "Vikram Shah"),
            tx(t("C001"), "S1", 100.0, 0.0, "Charges", "", "Asha Rao"),
            tx(n(1234567890.0), "S1", 100.0, 0.0, "Purchase", "", "Dummy Client"),
            tx(t("ND900"), "S1", 2000.0, 0.0, "Purchase", "", "Mehta Trust"),
            tx(t("ND123"), "S1", 2000.0, 0.0, "Purchase", "", "Mehta Trust"),
            tx(t("C001"), "S1", 10.0, 0.0, "Fee Reversal", "", "Asha Rao"),
        ],
    )
}

fn run_default() -> RunOutputs {
    let inputs = StagedInputs::new()
        .transactions(transactions())
        .reference_clients(reference_clients())
        .unwrap()
        .reference_schemes(reference_schemes())
        .unwrap()
        .master(master_workbook())
        .unwrap()
        .finish()
        .unwrap();
    run(&MisConfig::default(), &inputs).unwrap()
}

fn get<'a>(table: &'a Table, row: usize, column: &str) -> &'a Value {
    let idx = table
        .column_index(column)
        .unwrap_or_else(|| panic!("no column {column} in {}", table.name));
    &table.rows[row][idx]
}

fn find_row(table: &Table, column: &str, value: &str) -> usize {
    let idx = table.column_index(column).unwrap();
    table
        .rows
        .iter()
        .position(|r| r[idx].as_text() == value)
        .unwrap_or_else(|| panic!("no row with {column} = {value} in {}", table.name))
}

#[test]
fn summary_counts() {
    let out = run_default();
    assert_eq!(out.summary.new_clients, 1);
    assert_eq!(out.summary.new_schemes, 1);
    assert_eq!(out.summary.raw_rows, 8);
    assert_eq!(out.summary.working_rows, 6);
    assert_eq!(out.summary.final_rows, 4);
}

#[test]
fn raw_dump_keeps_every_row_and_column_order() {
    let out = run_default();
    let raw = &out.report.raw;
    assert_eq!(raw.len(), transactions().len());
    assert_eq!(raw.columns.len(), 7 + 24);
    assert_eq!(raw.columns[..7], transactions().columns[..]);
    assert_eq!(raw.columns[7], "Length");
    assert_eq!(raw.columns[30], "NTB FY");
}

#[test]
fn new_client_appended_with_blank_unmapped_columns() {
    let out = run_default();
    let client_master = out.master.table("Client Master", 0).unwrap();
    assert_eq!(client_master.len(), 2);
    let added = find_row(&client_master, "CLIENTCODE", "C100");
    assert_eq!(get(&client_master, added, "CLIENTNAME"), &t("Vikram Shah"));
    assert_eq!(get(&client_master, added, "Region"), &t(""));
}

#[test]
fn new_scheme_appended_below_preamble() {
    let out = run_default();
    let sheet = out.master.sheet("Scheme Master").unwrap();
    assert_eq!(sheet.grid[0], row(&["Scheme Master - maintained by ops"]));

    let scheme_master = out.master.table("Scheme Master", 1).unwrap();
    let added = find_row(&scheme_master, "SYMBOLID", "S2");
    assert_eq!(get(&scheme_master, added, "Scheme name"), &t("Beta Fund"));
    assert_eq!(get(&scheme_master, added, "DIMNAME15 Old"), &t("Beta AMC"));
    assert_eq!(get(&scheme_master, added, "New Product"), &t(""));
}

#[test]
fn updated_master_sheet_order() {
    let out = run_default();
    assert_eq!(
        out.master.sheet_names(),
        vec![
            "Client Master",
            "Scheme Master",
            "Read Me",
            "Ambit First",
            "Trnx Type Update",
            "Employee Mapping Master",
            "NTB Data",
        ]
    );
    assert_eq!(out.master.sheet("Read Me"), master_workbook().sheet("Read Me"));
}

#[test]
fn broker_change_becomes_aum_transfer_in_and_joins_new_masters() {
    let out = run_default();
    let fin = &out.report.final_view;
    let r = find_row(fin, "WS Account Code", "C100");
    assert_eq!(get(fin, r, "Consider"), &t("AUM Trf In"));
    assert_eq!(get(fin, r, "Trans Type 2"), &t("AUM Trf In"));
    assert_eq!(get(fin, r, "Gross Sales"), &t("Gross Sales"));
    assert_eq!(get(fin, r, "Scheme Name"), &t("Beta Fund"));
    assert_eq!(get(fin, r, "Family Group"), &t("Shah Family"));
    assert_eq!(get(fin, r, "Banker Name"), &t("Ravi Kumar"));
    assert_eq!(get(fin, r, "NTB FY"), &t("FY25"));
}

#[test]
fn sign_convention_on_crores() {
    let out = run_default();
    let raw = &out.report.raw;
    assert_eq!(get(raw, 0, "Revised Trnx Amount"), &n(50_000_000.0));
    assert_eq!(get(raw, 0, "Amt in Crs"), &n(5.0));
    assert_eq!(get(raw, 1, "Revised Trnx Amount"), &n(50_000_000.0));
    assert_eq!(get(raw, 1, "Amt in Crs"), &n(-5.0));
    assert_eq!(get(raw, 1, "Gross Sales"), &t("Redemption"));
}

#[test]
fn delete_flag_keeps_row_in_working_only() {
    let out = run_default();
    let working = &out.report.working;
    let r = find_row(working, "Tran Desc", "Charges");
    assert_eq!(get(working, r, "Delete"), &t("Delete"));

    let desc = out.report.final_view.column_index("Tran Desc").unwrap();
    assert!(out.report.final_view.rows.iter().all(|r| r[desc].as_text() != "Charges"));
}

#[test]
fn waterfall_tags_and_ambit_first() {
    let out = run_default();
    let raw = &out.report.raw;
    assert_eq!(get(raw, 4, "Length"), &n(10.0));
    // Del PAN wins over Del Dummy
    assert_eq!(get(raw, 4, "Del Tag"), &t("Del PAN"));
    assert_eq!(get(raw, 6, "Del Tag"), &t("Del PMS"));

    assert_eq!(get(raw, 5, "Del Tag"), &t(""));
    assert_eq!(get(raw, 5, "Ambit First"), &t("Ambit First"));
    assert_eq!(get(raw, 5, "Product"), &t("GPC - PMS"));
    assert_eq!(get(raw, 5, "Manufacturer"), &t("GPC - Ambit First"));
    assert_eq!(get(raw, 5, "Scheme Name"), &t("Alpha Fund"));

    let tagged: Vec<usize> = (0..raw.len()).filter(|&r| !get(raw, r, "Del Tag").is_blank()).collect();
    assert_eq!(tagged, vec![4, 6]);
    assert_eq!(out.report.working.len(), raw.len() - tagged.len());
}

#[test]
fn untyped_rows_stay_out_of_final() {
    let out = run_default();
    let working = &out.report.working;
    let r = find_row(working, "Tran Desc", "Fee Reversal");
    assert_eq!(get(working, r, "Consider"), &t(""));
    assert_eq!(get(working, r, "Gross Sales"), &t(""));
    assert_eq!(get(working, r, "Amt in Crs"), &n(0.000001));

    let fin = &out.report.final_view;
    assert!((0..fin.len()).all(|r| !get(fin, r, "Consider").is_blank()));
}

#[test]
fn report_workbook_sheet_names() {
    let out = run_default();
    assert_eq!(out.report.to_workbook().sheet_names(), vec!["Raw Dump", "Working", "Final"]);
}

#[test]
fn missing_master_sheet_aborts_run() {
    let mut master = master_workbook();
    master.sheets.retain(|s| s.name != "NTB Data");
    let inputs = StagedInputs::new()
        .transactions(transactions())
        .reference_clients(reference_clients())
        .unwrap()
        .reference_schemes(reference_schemes())
        .unwrap()
        .master(master)
        .unwrap()
        .finish()
        .unwrap();
    let err = run(&MisConfig::default(), &inputs).unwrap_err();
    assert!(matches!(err, MisError::MissingSheet { ref sheet } if sheet == "NTB Data"));
}

#[test]
fn unresolvable_transaction_column_aborts_run() {
    let mut tx = transactions();
    tx.columns[1] = "Scrip".into();
    let inputs = StagedInputs::new()
        .transactions(tx)
        .reference_clients(reference_clients())
        .unwrap()
        .reference_schemes(reference_schemes())
        .unwrap()
        .master(master_workbook())
        .unwrap()
        .finish()
        .unwrap();
    let err = run(&MisConfig::default(), &inputs).unwrap_err();
    assert!(matches!(err, MisError::ColumnNotFound { ref table, .. } if table == "Extract"));
}

#[test]
fn typed_cells_survive_in_master_and_lose_time_in_report() {
    let day = chrono::NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
    let stamp = Value::DateTime(day.and_hms_opt(10, 30, 0).unwrap());

    let mut master = master_workbook();
    let ntb = master.sheets.iter_mut().find(|s| s.name == "NTB Data").unwrap();
    ntb.grid[1].extend([stamp.clone(), Value::Bool(true), Value::Error("#N/A".into())]);
    let ntb_grid = ntb.grid.clone();

    let mut extract = transactions();
    extract.columns.push("Trade Time".into());
    for r in &mut extract.rows {
        r.push(stamp.clone());
    }

    let inputs = StagedInputs::new()
        .transactions(extract)
        .reference_clients(reference_clients())
        .unwrap()
        .reference_schemes(reference_schemes())
        .unwrap()
        .master(master)
        .unwrap()
        .finish()
        .unwrap();
    let out = run(&MisConfig::default(), &inputs).unwrap();

    assert_eq!(out.master.sheet("NTB Data").unwrap().grid, ntb_grid);
    assert_eq!(get(&out.report.raw, 0, "Trade Time"), &Value::Date(day));
}
