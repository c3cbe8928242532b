use assert_cmd::Command;
use predicates::prelude::*;

fn posreport(home: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("posreport").unwrap();
    cmd.env("HOME", home)
        .env("LOG_LEVEL", "error")
        .env_remove("EMAIL_TO")
        .env_remove("TOTEAT_USE_LOCAL_FILE")
        .current_dir(home);
    cmd
}

#[test]
fn report_from_sales_csv() {
    let home = tempfile::tempdir().unwrap();
    let csv = home.path().join("ventas.csv");
    std::fs::write(
        &csv,
        "ID,Producto,Cantidad,Valor Venta\n1,Pizza Margherita,2,10000\n2,Coca Cola,1,1500\n",
    )
    .unwrap();

    posreport(home.path())
        .args(["report", csv.to_str().unwrap(), "--date", "2024-03-05", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total_excl_tax\": 11500"))
        .stdout(predicate::str::contains("\"category\": \"PIZZAS\""));
}

#[test]
fn report_writes_export_file() {
    let home = tempfile::tempdir().unwrap();
    let payload = home.path().join("orders.json");
    std::fs::write(
        &payload,
        r#"[{"name": "Margherita", "quantity": 2, "netAmount": 10000},
            {"name": "Coca Cola", "quantity": 1, "netAmount": 1500, "taxAmount": 0}]"#,
    )
    .unwrap();
    let out = home.path().join("out.csv");

    posreport(home.path())
        .args([
            "report",
            payload.to_str().unwrap(),
            "--date",
            "2024-03-05",
            "--location",
            "Domani Providencia",
            "--format",
            "csv",
            "--output",
            out.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Total revenue incl. tax,13400"))
        .stdout(predicate::str::contains("Begin date,05/03/2024"));

    let bytes = std::fs::read(&out).unwrap();
    assert!(bytes.starts_with(b"\xEF\xBB\xBF"));
}

#[test]
fn report_rejects_empty_csv() {
    let home = tempfile::tempdir().unwrap();
    let csv = home.path().join("empty.csv");
    std::fs::write(&csv, "ID,Producto,Cantidad,Valor Venta\n").unwrap();

    posreport(home.path())
        .args(["report", csv.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: "));
}

#[test]
fn rules_test_reports_first_match() {
    let home = tempfile::tempdir().unwrap();
    posreport(home.path())
        .args(["rules", "test", "Pizza Extra Cheese"])
        .assert()
        .success()
        .stdout(predicate::str::contains("AGREGADO"));
}

#[test]
fn init_writes_settings_once() {
    let home = tempfile::tempdir().unwrap();
    let data = home.path().join("data");

    posreport(home.path())
        .args(["init", "--data-dir", data.to_str().unwrap()])
        .assert()
        .success();
    let settings = home.path().join(".config/posreport/settings.json");
    let content = std::fs::read_to_string(&settings).unwrap();
    assert!(content.contains("category_rules"));
    assert!(data.is_dir());

    posreport(home.path())
        .args(["init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn collection_from_saved_payload() {
    let home = tempfile::tempdir().unwrap();
    let payload = home.path().join("collection.json");
    std::fs::write(
        &payload,
        r#"{"ok": true, "data": {"shifts": {"1": {"name": "Cena", "registers": {"3": [
            {"registerName": "Caja 1", "paymentMethods": [
                {"paymentMethodID": 1, "paymentMethod": "Efectivo", "amount": 25000},
                {"paymentMethodID": 2, "paymentMethod": "Tarjeta", "amount": 75000}
            ]}]}}}}}"#,
    )
    .unwrap();
    let csv = home.path().join("pagos.csv");

    posreport(home.path())
        .args([
            "collection",
            payload.to_str().unwrap(),
            "--date",
            "2024-03-05",
            "--json",
            "--csv",
            csv.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total_amount\": 100000"))
        .stdout(predicate::str::contains("\"percentage\": 75.0"));

    let text = std::fs::read_to_string(&csv).unwrap();
    assert!(text.contains("2024-03-05,Cena,Caja 1,Tarjeta,75000"));
}

#[test]
fn collection_from_uploaded_csv() {
    let home = tempfile::tempdir().unwrap();
    let upload = home.path().join("recaudacion.csv");
    std::fs::write(
        &upload,
        "Turno,Caja,Metodo de Pago,Monto\nCena,Caja 1,Efectivo,25000\nCena,Caja 2,Tarjeta,75000\n",
    )
    .unwrap();

    posreport(home.path())
        .args(["collection", upload.to_str().unwrap(), "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"grandTotal\": 100000"))
        .stdout(predicate::str::contains("\"percentage\": 75.0"))
        .stdout(predicate::str::contains("\"byCaja\""));

    posreport(home.path())
        .args(["collection", upload.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tarjeta"))
        .stdout(predicate::str::contains("Caja 2"));
}

#[test]
fn collection_csv_without_rows_fails() {
    let home = tempfile::tempdir().unwrap();
    let upload = home.path().join("vacio.csv");
    std::fs::write(&upload, "Turno,Monto\n").unwrap();

    posreport(home.path())
        .args(["collection", upload.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no data rows"));
}
