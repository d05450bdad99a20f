//! Full runs from snapshot files to report files

use clap::Parser;
use order_audit::{Args, Config, run};
use std::fs;
use std::path::Path;

fn write_inputs(dir: &Path) {
    fs::write(dir.join("ids.txt"), "100001\n100002.0\n\n 100004 \n999999\n100001\n").unwrap();
    fs::write(
        dir.join("details.json"),
        r#"[
            {"pedido_normalizado": "100001", "pedido_raw": "10000100", "validacao_pedido": "Pedido",
             "valor_normalizado": "150.00", "bloqueada": "T", "canal_venda": "LOJA"},
            {"pedido_normalizado": "100002", "pedido_raw": "10000201_CANC", "validacao_pedido": "NF",
             "valor_normalizado": 80, "nfe_cstat": "101", "canal_venda": "SITE"},
            {"pedido_normalizado": "100004", "pedido_raw": "10000401", "validacao_pedido": "NF",
             "valor_normalizado": "500.00", "canal_venda": "SITE"}
        ]"#,
    )
    .unwrap();
    fs::write(
        dir.join("crm.json"),
        r#"[
            {"pedido_normalizado": "100004", "pedido_raw": "10000401", "andamento_descricao": "FINALIZADO",
             "andamento_obs": "CARTA DE DEBITO ENVIADA", "datahora_andamento": "10/05/2024 14:00:00"}
        ]"#,
    )
    .unwrap();
}

fn args(dir: &Path, extra: &[&str]) -> Args {
    let ids = dir.join("ids.txt");
    let details = dir.join("details.json");
    let crm = dir.join("crm.json");
    let out = dir.join("out");
    let mut argv = vec![
        "order-audit".to_string(),
        ids.display().to_string(),
        "--details".into(),
        details.display().to_string(),
        "--crm".into(),
        crm.display().to_string(),
        "--output".into(),
        out.display().to_string(),
    ];
    argv.extend(extra.iter().map(|s| s.to_string()));
    Args::try_parse_from(argv).unwrap()
}

#[tokio::test]
async fn snapshot_run_writes_reports() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());

    let summary = run(&args(dir.path(), &[]), &Config::default()).await.unwrap();

    assert_eq!(summary.files.len(), 4);
    assert_eq!(summary.stats.requested, 4);
    assert_eq!(summary.stats.classified, 3);
    assert_eq!(summary.stats.not_found, 1);
    assert!(summary.failures.is_empty());

    let summary_rows: serde_json::Value =
        serde_json::from_slice(&fs::read(dir.path().join("out/summary.json")).unwrap()).unwrap();
    let categories: Vec<_> = summary_rows
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["category"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        categories,
        vec!["blocked_without_billing", "fully_canceled_billing", "debit_note_sent"]
    );

    let not_found: serde_json::Value =
        serde_json::from_slice(&fs::read(dir.path().join("out/not_found.json")).unwrap()).unwrap();
    assert_eq!(not_found[0]["requested"], "999999");
}

#[tokio::test]
async fn filters_only_restrict_exported_rows() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());

    let summary = run(&args(dir.path(), &["--channel", "SITE"]), &Config::default())
        .await
        .unwrap();
    assert_eq!(summary.stats.classified, 3);

    let rows: serde_json::Value =
        serde_json::from_slice(&fs::read(dir.path().join("out/details.json")).unwrap()).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 2);
    assert_eq!(rows[1]["latest_note"], "CARTA DE DEBITO ENVIADA");
    assert_eq!(rows[1]["latest_at"], "10/05/2024 14:00:00");
}

#[tokio::test]
async fn invalid_policy_fails_before_reading_records() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());
    let policy = dir.path().join("policy.json");
    fs::write(
        &policy,
        r#"{"version": "broken", "rules": [
            {"category": "pending_cancellation", "predicate": {"kind": "latest_document_note", "pattern": "(LIB"}}
        ]}"#,
    )
    .unwrap();

    let args = args(dir.path(), &["--policy", policy.to_str().unwrap()]);
    assert!(run(&args, &Config::default()).await.is_err());
    assert!(!dir.path().join("out").exists());
}

#[tokio::test]
async fn empty_identifier_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());
    fs::write(dir.path().join("ids.txt"), "\n   \n").unwrap();

    assert!(run(&args(dir.path(), &[]), &Config::default()).await.is_err());
}
