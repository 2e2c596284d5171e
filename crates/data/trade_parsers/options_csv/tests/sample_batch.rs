use models::{Action, LegStatus, OptionType};
use options_csv::{
    import_files, preview_csv, FileOutcome, ImportError, ImportOptions, PresetSelection, SourceFile,
};
use utils::{JsonFileRepository, MemoryRepository, Repository};

const SAMPLE: &str = "\
UNDERLYING SYMBOL,OPTION SYMBOL,BUY/SELL,OPEN/CLOSE INDICATOR,QUANTITY,TRADE PRICE,EXPIRATION DATE,STRIKE,RIGHT,TRADE DATE,TIME,COMMISSION,REALIZED P/L,DESCRIPTION
AAPL,AAPL  20250719C00180000,SELL,OPEN,1,1.25,2025-07-19,180.00,C,2025-07-01,10:31:00,-0.50,0.00,SELL 1 AAPL 19 JUL 25 180 C
AAPL,AAPL  20250719C00180000,BUY,CLOSE,1,0.50,2025-07-19,180.00,C,2025-07-10,14:12:00,-0.50,75.00,BUY 1 AAPL 19 JUL 25 180 C
";

fn options() -> ImportOptions {
    ImportOptions {
        today: "2025-07-20".to_string(),
        ..Default::default()
    }
}

#[test]
fn test_sample_twice_in_one_batch() {
    let mut repo = MemoryRepository::default();
    let files = vec![SourceFile::new("a.csv", SAMPLE), SourceFile::new("b.csv", SAMPLE)];

    let summary = import_files(&mut repo, &files, PresetSelection::Auto, options()).unwrap();
    assert_eq!(summary.added, 2);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.used_preset.as_deref(), Some("ibkr"));
    assert_eq!(repo.saves, 1);

    assert_eq!(repo.positions.len(), 1);
    let pos = &repo.positions[0];
    assert_eq!(pos.title, "AAPL");
    assert_eq!(pos.tags, vec!["import_csv", "ibkr"]);
    assert_eq!(pos.open_date, "2025-07-01");
    assert_eq!(pos.legs.len(), 2);

    let open = &pos.legs[0];
    assert_eq!(open.action, Action::Sell);
    assert_eq!(open.status, LegStatus::Open);
    assert_eq!(open.option_type, OptionType::Call);
    assert_eq!(open.strike, "180.00");
    assert_eq!(open.expiry, "2025-07-19");
    assert_eq!(open.premium, "1.25");
    assert_eq!(open.contracts, "1");
    assert_eq!(open.fees, "-0.50");
    assert_eq!(open.notes, "SELL 1 AAPL 19 JUL 25 180 C");

    let close = &pos.legs[1];
    assert_eq!(close.action, Action::Buy);
    assert_eq!(close.status, LegStatus::Closed);
    assert_eq!(close.close_date, "2025-07-10");
    assert_eq!(close.pl, "75.00");

    // same strike on both sides: grouped as a spread, no width
    assert_eq!(pos.groups.len(), 1);
    assert!(pos.legs.iter().all(|l| l.width.is_none()));
}

#[test]
fn test_second_file_per_outcome() {
    let mut repo = MemoryRepository::default();
    let files = vec![SourceFile::new("a.csv", SAMPLE), SourceFile::new("b.csv", SAMPLE)];
    let summary = import_files(&mut repo, &files, PresetSelection::Auto, options()).unwrap();

    match &summary.files[1].outcome {
        FileOutcome::Imported(done) => {
            assert_eq!((done.added, done.skipped), (0, 2));
            assert_eq!(done.preset, "ibkr");
        }
        FileOutcome::Failed(e) => panic!("unexpected failure: {}", e),
    }
}

#[test]
fn test_missing_contracts_column_names_the_field() {
    let text = "Symbol,Type,Side,Strike,Expiry,Price\nSPY,Put,Sell,500,2025-10-17,2\n";
    let mut repo = MemoryRepository::default();
    let summary = import_files(
        &mut repo,
        &[SourceFile::new("no_qty.csv", text)],
        PresetSelection::Auto,
        options(),
    )
    .unwrap();

    assert_eq!(summary.added, 0);
    match &summary.files[0].outcome {
        FileOutcome::Failed(err) => {
            assert!(matches!(
                err,
                ImportError::MissingColumns { missing, .. } if missing == &vec!["contracts".to_string()]
            ));
            assert!(err.to_string().contains("contracts"));
        }
        other => panic!("expected missing columns, got {:?}", other),
    }
    assert!(repo.positions.is_empty());
}

#[test]
fn test_import_persists_through_json_repository() {
    let dir = tempfile::tempdir().unwrap();
    let mut repo = JsonFileRepository::new(dir.path());
    import_files(
        &mut repo,
        &[SourceFile::new("a.csv", SAMPLE)],
        PresetSelection::Auto,
        options(),
    )
    .unwrap();

    let reloaded = JsonFileRepository::new(dir.path()).load();
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded[0].legs.len(), 2);

    // a fresh batch without seeded dedupe appends again
    let summary = import_files(
        &mut repo,
        &[SourceFile::new("a.csv", SAMPLE)],
        PresetSelection::Auto,
        options(),
    )
    .unwrap();
    assert_eq!(summary.added, 2);
    assert_eq!(repo.load()[0].legs.len(), 4);
}

#[test]
fn test_semicolon_european_export() {
    let text = "Símbolo subyacente;Tipo;Compra/Venta;Precio de ejercicio;Fecha de vencimiento;\
Precio de la operación;Cantidad;Comisión;Fecha de operación\n\
MSFT;Put;Venta;412,5;19-Sep-2025;1.234,50;-1;0,65;20250901\n";
    let mut repo = MemoryRepository::default();
    let summary = import_files(
        &mut repo,
        &[SourceFile::new("es.csv", text)],
        PresetSelection::Auto,
        options(),
    )
    .unwrap();
    assert_eq!(summary.added, 1);

    let leg = &repo.positions[0].legs[0];
    assert_eq!(leg.ticker, "MSFT");
    assert_eq!(leg.option_type, OptionType::Put);
    assert_eq!(leg.strike, "412.5");
    assert_eq!(leg.expiry, "2025-09-19");
    assert_eq!(leg.premium, "1234.50");
    assert_eq!(leg.contracts, "1");
    assert_eq!(leg.fees, "0.65");
    assert_eq!(leg.open_date, "2025-09-01");
}

#[test]
fn test_preview_of_sample() {
    let preview = preview_csv(SAMPLE, PresetSelection::Auto, "2025-07-20").unwrap();
    assert_eq!(preview.detected, Some("ibkr"));
    assert!(preview.is_importable());
    assert_eq!(preview.option_symbol.as_deref(), Some("OPTION SYMBOL"));
    assert_eq!(preview.rows.len(), 2);
    assert_eq!(preview.rows[0].action, "Sell/Open");
    assert_eq!(preview.rows[1].action, "Buy/Close");
}

#[test]
fn test_import_keeps_stored_positions_the_model_cannot_read() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("journal.json");
    std::fs::write(
        &file,
        r#"[{"id":"p1","title":"MSFT","status":"Abierta"},{"id":"p2","title":"TSLA","status":"Parcial"}]"#,
    )
    .unwrap();

    let mut repo = JsonFileRepository::new(dir.path());
    assert_eq!(repo.load().len(), 1);

    let text = "Symbol,Type,Side,Strike,Expiry,Price,Qty\nSPY,Put,Sell,500,2025-10-17,2,1\n";
    let summary = import_files(
        &mut repo,
        &[SourceFile::new("spy.csv", text)],
        PresetSelection::Auto,
        options(),
    )
    .unwrap();
    assert_eq!(summary.added, 1);

    let written = std::fs::read_to_string(&file).unwrap();
    assert!(written.contains("\"MSFT\""));
    assert!(written.contains("\"TSLA\""));
    assert!(written.contains("\"Parcial\""));

    let titles: Vec<String> = repo.load().into_iter().map(|p| p.title).collect();
    assert_eq!(titles, vec!["MSFT", "SPY"]);
}
