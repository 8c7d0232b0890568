use crate::analytics::{DashboardReport, KeyCount, TechnicianRow};

fn fmt_ratio(r: Option<f64>) -> String {
    match r {
        None => "UNKNOWN".to_string(),
        Some(v) => format!("{:.1}%", v * 100.0),
    }
}

fn fmt_opt_f64(v: Option<f64>, unit: &str) -> String {
    match v {
        None => "UNKNOWN".to_string(),
        Some(x) => format!("{x:.1}{unit}"),
    }
}

fn fmt_opt_str(v: Option<&str>) -> &str {
    v.unwrap_or("UNKNOWN")
}

fn key_count_table(out: &mut String, header: &str, rows: &[KeyCount]) {
    out.push_str(&format!("| {header} | Count |\n|---|---:|\n"));
    if rows.is_empty() {
        out.push_str("| (none) | 0 |\n");
    }
    for r in rows {
        out.push_str(&format!("| {} | {} |\n", r.key, r.value));
    }
    out.push('\n');
}

fn technician_table(out: &mut String, rows: &[TechnicianRow]) {
    out.push_str("| Technician | Open | Closed (recent) | Total | Avg resolution |\n");
    out.push_str("|---|---:|---:|---:|---:|\n");
    if rows.is_empty() {
        out.push_str("| (none) | 0 | 0 | 0 | UNKNOWN |\n");
    }
    for r in rows {
        let label = match (&r.nombre, &r.email) {
            (Some(n), Some(e)) => format!("{n} <{e}>"),
            (Some(n), None) => n.clone(),
            (None, Some(e)) => e.clone(),
            (None, None) => format!("#{}", r.tecnico_uid),
        };
        out.push_str(&format!(
            "| {label} | {} | {} | {} | {} |\n",
            r.open,
            r.closed_30d,
            r.total,
            fmt_opt_f64(r.avg_res_horas, "h")
        ));
    }
    out.push('\n');
}

/// Deterministic Markdown rendering of a dashboard report. Section order and row order
/// follow the report, so output is snapshot-testable.
pub fn render_dashboard_markdown(report: &DashboardReport) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "# Incident Dashboard (last {} days)\n\n",
        report.timeframe_days
    ));
    out.push_str(&format!(
        "- Incidents: {}\n- Open: {}\n- Closed: {}\n\n",
        report.totals.incidencias, report.totals.abiertas, report.totals.cerradas
    ));

    out.push_str("## SLA compliance\n\n");
    out.push_str(&format!(
        "- Attention within deadline: {}\n- Closure within deadline: {}\n\n",
        fmt_ratio(report.sla.atencion_dentro),
        fmt_ratio(report.sla.cierre_dentro)
    ));

    out.push_str("## Backlog age\n\n| Bucket | Open incidents |\n|---|---:|\n");
    for b in &report.backlog.buckets {
        out.push_str(&format!("| {} | {} |\n", b.key, b.value));
    }
    out.push_str(&format!(
        "\nAverage open age: {}\n\n",
        fmt_opt_f64(report.backlog.antiguedad_promedio_dias, " days")
    ));

    out.push_str("## Categories\n\n");
    key_count_table(&mut out, "Most reported", &report.categorias.top);
    key_count_table(&mut out, "Least reported", &report.categorias.bottom);

    out.push_str("## Status\n\n");
    key_count_table(&mut out, "Status", &report.estados);

    out.push_str("## Priority\n\n");
    key_count_table(&mut out, "Priority", &report.prioridades);

    out.push_str("## Projects\n\n| Project | Incidents | Units | Incidents per unit |\n|---|---:|---:|---:|\n");
    for p in &report.proyectos.top_reportes {
        let name = p
            .nombre
            .clone()
            .unwrap_or_else(|| format!("#{}", p.id));
        out.push_str(&format!(
            "| {name} | {} | {} | {} |\n",
            p.count,
            p.viviendas,
            fmt_opt_f64(p.ratio_inc_por_viv, "")
        ));
    }
    out.push('\n');

    out.push_str("## Technician workload\n\n### Most open\n\n");
    technician_table(&mut out, &report.tecnicos.top_carga);
    out.push_str("### Most resolved recently\n\n");
    technician_table(&mut out, &report.tecnicos.top_resoluciones_30d);

    out.push_str("## Housing units\n\n| Unit | Address | Incidents |\n|---|---|---:|\n");
    for h in &report.viviendas.top_reportes {
        out.push_str(&format!(
            "| {} | {} | {} |\n",
            h.id_vivienda,
            fmt_opt_str(h.direccion.as_deref()),
            h.count
        ));
    }

    out
}
