use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub mod window;

pub use window::AggregationWindow;

use crate::config::DashboardSettings;
use crate::domain::{
    is_closed_status, is_open_status, Housing, Incident, IncidentStatus, Project, Technician,
    UserRole,
};
use crate::error::AppError;
use crate::metrics::{compute_incident_metrics, IncidentMetrics, SECONDS_PER_DAY};
use crate::repo::DashboardRepository;

pub const UNCATEGORIZED: &str = "uncategorized";
pub const UNKNOWN_STATUS: &str = "unknown";
pub const NO_PRIORITY: &str = "sin";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyCount {
    pub key: String,
    pub value: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Totals {
    pub incidencias: i64,
    pub abiertas: i64,
    pub cerradas: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryStats {
    pub top: Vec<KeyCount>,
    pub bottom: Vec<KeyCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectRow {
    pub id: i64,
    pub nombre: Option<String>,
    pub count: i64,
    pub viviendas: i64,
    #[serde(rename = "ratioIncPorViv")]
    pub ratio_inc_por_viv: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectStats {
    #[serde(rename = "topReportes")]
    pub top_reportes: Vec<ProjectRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TechnicianRow {
    pub tecnico_uid: i64,
    pub open: i64,
    #[serde(rename = "closed30d")]
    pub closed_30d: i64,
    pub total: i64,
    #[serde(rename = "avgResHoras")]
    pub avg_res_horas: Option<f64>,
    pub nombre: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TechnicianStats {
    #[serde(rename = "topCarga")]
    pub top_carga: Vec<TechnicianRow>,
    #[serde(rename = "topResoluciones30d")]
    pub top_resoluciones_30d: Vec<TechnicianRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HousingRow {
    pub id_vivienda: i64,
    pub count: i64,
    pub direccion: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HousingStats {
    #[serde(rename = "topReportes")]
    pub top_reportes: Vec<HousingRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BacklogStats {
    /// One entry per bucket in ascending age order. Serialized as a JSON object whose keys
    /// keep that order.
    #[serde(with = "ordered_buckets")]
    pub buckets: Vec<KeyCount>,
    #[serde(rename = "antiguedadPromedioDias")]
    pub antiguedad_promedio_dias: Option<f64>,
}

mod ordered_buckets {
    use std::fmt;

    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};

    use super::KeyCount;

    pub fn serialize<S>(buckets: &[KeyCount], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(buckets.len()))?;
        for b in buckets {
            map.serialize_entry(&b.key, &b.value)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<KeyCount>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct BucketVisitor;

        impl<'de> Visitor<'de> for BucketVisitor {
            type Value = Vec<KeyCount>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of bucket label to count")
            }

            fn visit_map<M>(self, mut map: M) -> Result<Vec<KeyCount>, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut out = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, i64>()? {
                    out.push(KeyCount { key, value });
                }
                Ok(out)
            }
        }

        deserializer.deserialize_map(BucketVisitor)
    }
}

/// Ratios in `[0, 1]`, `None` when nothing qualifies for the denominator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlaCompliance {
    #[serde(rename = "atencionDentro")]
    pub atencion_dentro: Option<f64>,
    #[serde(rename = "cierreDentro")]
    pub cierre_dentro: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardReport {
    #[serde(rename = "timeframeDays")]
    pub timeframe_days: u32,
    pub totals: Totals,
    pub categorias: CategoryStats,
    pub estados: Vec<KeyCount>,
    pub prioridades: Vec<KeyCount>,
    pub proyectos: ProjectStats,
    pub tecnicos: TechnicianStats,
    pub viviendas: HousingStats,
    pub backlog: BacklogStats,
    pub sla: SlaCompliance,
}

/// Snapshot the aggregator reduces. `technicians` is the directory used for enrichment and
/// for the no-activity fallback.
#[derive(Debug, Clone, Copy)]
pub struct DashboardInputs<'a> {
    pub incidents: &'a [Incident],
    pub housings: &'a [Housing],
    pub projects: &'a [Project],
    pub technicians: &'a [Technician],
}

/// Incident paired with the metrics derived for the current `now`.
#[derive(Debug, Clone)]
pub struct MeasuredIncident<'a> {
    pub incident: &'a Incident,
    pub metrics: IncidentMetrics,
}

pub fn measure_incidents(incidents: &[Incident], now: time::OffsetDateTime) -> Vec<MeasuredIncident<'_>> {
    let mut warning_count = 0usize;
    let measured = incidents
        .iter()
        .map(|incident| {
            let (metrics, warnings) = compute_incident_metrics(incident, now);
            for w in &warnings {
                debug!(incident_id = incident.id, code = %w.code, details = ?w.details, "{}", w.message);
            }
            warning_count += warnings.len();
            MeasuredIncident { incident, metrics }
        })
        .collect::<Vec<_>>();
    if warning_count > 0 {
        debug!(warning_count, "incident metrics computed with data warnings");
    }
    measured
}

fn sorted_desc(map: BTreeMap<String, i64>) -> Vec<KeyCount> {
    let mut items = map
        .into_iter()
        .map(|(key, value)| KeyCount { key, value })
        .collect::<Vec<_>>();
    // Deterministic ordering: count desc, then key.
    items.sort_by(|a, b| (-a.value, &a.key).cmp(&(-b.value, &b.key)));
    items
}

fn category_key(raw: Option<&str>) -> String {
    let normalized = raw.map(|s| s.trim().to_lowercase()).unwrap_or_default();
    if normalized.is_empty() {
        UNCATEGORIZED.to_string()
    } else {
        normalized
    }
}

pub fn category_distribution(incidents: &[Incident], top_n: usize) -> CategoryStats {
    let mut counts: BTreeMap<String, i64> = BTreeMap::new();
    for inc in incidents {
        *counts.entry(category_key(inc.category.as_deref())).or_default() += 1;
    }

    let mut bottom = counts
        .iter()
        .filter(|(k, _)| k.as_str() != UNCATEGORIZED)
        .map(|(k, v)| KeyCount {
            key: k.clone(),
            value: *v,
        })
        .collect::<Vec<_>>();
    bottom.sort_by(|a, b| (a.value, &a.key).cmp(&(b.value, &b.key)));
    bottom.truncate(top_n);

    let mut top = sorted_desc(counts);
    top.truncate(top_n);

    CategoryStats { top, bottom }
}

/// Per-status counts plus the open/closed totals. Unrecognized or missing statuses are
/// counted under `unknown`, so counts always sum to the incident total.
pub fn status_distribution(incidents: &[Incident]) -> (Vec<KeyCount>, Totals) {
    let mut counts: BTreeMap<String, i64> = BTreeMap::new();
    let mut abiertas = 0;
    let mut cerradas = 0;
    for inc in incidents {
        let raw = inc.status.as_deref();
        let key = raw
            .and_then(IncidentStatus::parse)
            .map(|s| s.as_str())
            .unwrap_or(UNKNOWN_STATUS);
        *counts.entry(key.to_string()).or_default() += 1;
        if is_open_status(raw) {
            abiertas += 1;
        }
        if is_closed_status(raw) {
            cerradas += 1;
        }
    }
    (
        sorted_desc(counts),
        Totals {
            incidencias: incidents.len() as i64,
            abiertas,
            cerradas,
        },
    )
}

pub fn priority_distribution(incidents: &[Incident]) -> Vec<KeyCount> {
    let mut counts: BTreeMap<String, i64> = BTreeMap::new();
    for inc in incidents {
        let normalized = inc
            .priority
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .unwrap_or_default();
        let key = if normalized.is_empty() {
            NO_PRIORITY.to_string()
        } else {
            normalized
        };
        *counts.entry(key).or_default() += 1;
    }
    sorted_desc(counts)
}

pub fn project_ranking(
    incidents: &[Incident],
    housings: &[Housing],
    projects: &[Project],
    top_n: usize,
) -> Vec<ProjectRow> {
    let housing_project: HashMap<i64, i64> = housings
        .iter()
        .filter_map(|h| h.project_id.map(|p| (h.id, p)))
        .collect();

    let mut units_per_project: HashMap<i64, i64> = HashMap::new();
    for project_id in housing_project.values() {
        *units_per_project.entry(*project_id).or_default() += 1;
    }

    let mut counts: BTreeMap<i64, i64> = BTreeMap::new();
    for inc in incidents {
        let project_id = housing_project
            .get(&inc.housing_id)
            .copied()
            .or(inc.project_id);
        if let Some(project_id) = project_id {
            *counts.entry(project_id).or_default() += 1;
        }
    }

    let names: HashMap<i64, &Project> = projects.iter().map(|p| (p.id, p)).collect();

    let mut rows = counts
        .into_iter()
        .map(|(id, count)| {
            let viviendas = units_per_project.get(&id).copied().unwrap_or(0);
            ProjectRow {
                id,
                nombre: names.get(&id).and_then(|p| p.name.clone()),
                count,
                viviendas,
                ratio_inc_por_viv: (viviendas > 0).then(|| count as f64 / viviendas as f64),
            }
        })
        .collect::<Vec<_>>();
    rows.sort_by(|a, b| (-a.count, a.id).cmp(&(-b.count, b.id)));
    rows.truncate(top_n);
    rows
}

#[derive(Debug, Default)]
struct WorkloadAcc {
    open: i64,
    closed_recent: i64,
    total: i64,
    resolution_hours: Vec<f64>,
}

/// Unsorted workload rows, one per assigned technician, without directory enrichment.
pub fn technician_workload(
    measured: &[MeasuredIncident<'_>],
    closed_window_days: i64,
) -> Vec<TechnicianRow> {
    let window_secs = closed_window_days.saturating_mul(SECONDS_PER_DAY);
    let mut acc: BTreeMap<i64, WorkloadAcc> = BTreeMap::new();

    for m in measured {
        let Some(tech_id) = m.incident.assigned_technician_id else {
            continue;
        };
        let entry = acc.entry(tech_id).or_default();
        entry.total += 1;
        if is_open_status(m.incident.status.as_deref()) {
            entry.open += 1;
        }
        // Settled within the window before `now`; future-dated settlements do not count.
        if m.metrics
            .settled_seconds_ago
            .is_some_and(|ago| (0..=window_secs).contains(&ago))
        {
            entry.closed_recent += 1;
        }
        if let Some(secs) = m.metrics.resolution_seconds {
            entry.resolution_hours.push(secs as f64 / 3600.0);
        }
    }

    acc.into_iter()
        .map(|(tecnico_uid, a)| TechnicianRow {
            tecnico_uid,
            open: a.open,
            closed_30d: a.closed_recent,
            total: a.total,
            avg_res_horas: mean(&a.resolution_hours),
            nombre: None,
            email: None,
        })
        .collect()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Rank workload rows into the two top views, enriching names from `directory`.
///
/// When there is no technician activity at all, the first `top_n` directory entries with
/// the technician role (by id) stand in with zeroed counters.
pub fn technician_rankings(
    mut workload: Vec<TechnicianRow>,
    directory: &[Technician],
    top_n: usize,
) -> TechnicianStats {
    let by_id: HashMap<i64, &Technician> = directory.iter().map(|t| (t.id, t)).collect();
    for row in &mut workload {
        if let Some(t) = by_id.get(&row.tecnico_uid) {
            row.nombre = t.name.clone();
            row.email = t.email.clone();
        }
    }

    let mut top_carga = workload.clone();
    top_carga.sort_by(|a, b| (-a.open, a.tecnico_uid).cmp(&(-b.open, b.tecnico_uid)));
    top_carga.truncate(top_n);

    let mut top_resoluciones_30d = workload;
    top_resoluciones_30d
        .sort_by(|a, b| (-a.closed_30d, a.tecnico_uid).cmp(&(-b.closed_30d, b.tecnico_uid)));
    top_resoluciones_30d.truncate(top_n);

    if top_carga.is_empty() && top_resoluciones_30d.is_empty() {
        let mut idle = directory
            .iter()
            .filter(|t| t.role == UserRole::Tecnico)
            .collect::<Vec<_>>();
        idle.sort_by_key(|t| t.id);
        let rows = idle
            .into_iter()
            .take(top_n)
            .map(|t| TechnicianRow {
                tecnico_uid: t.id,
                open: 0,
                closed_30d: 0,
                total: 0,
                avg_res_horas: None,
                nombre: t.name.clone(),
                email: t.email.clone(),
            })
            .collect::<Vec<_>>();
        return TechnicianStats {
            top_carga: rows.clone(),
            top_resoluciones_30d: rows,
        };
    }

    TechnicianStats {
        top_carga,
        top_resoluciones_30d,
    }
}

pub fn housing_ranking(incidents: &[Incident], housings: &[Housing], top_n: usize) -> Vec<HousingRow> {
    let mut counts: BTreeMap<i64, i64> = BTreeMap::new();
    for inc in incidents {
        *counts.entry(inc.housing_id).or_default() += 1;
    }
    let addresses: HashMap<i64, &Housing> = housings.iter().map(|h| (h.id, h)).collect();

    let mut rows = counts
        .into_iter()
        .map(|(id_vivienda, count)| HousingRow {
            id_vivienda,
            count,
            direccion: addresses.get(&id_vivienda).and_then(|h| h.address.clone()),
        })
        .collect::<Vec<_>>();
    rows.sort_by(|a, b| (-a.count, a.id_vivienda).cmp(&(-b.count, b.id_vivienda)));
    rows.truncate(top_n);
    rows
}

/// Bucket labels for inclusive upper bounds, e.g. `[7, 14]` → `0-7d`, `8-14d`, `14d+`.
pub fn backlog_bucket_labels(bounds: &[i64]) -> Vec<String> {
    let mut labels = Vec::with_capacity(bounds.len() + 1);
    let mut lower = 0;
    for upper in bounds {
        labels.push(format!("{lower}-{upper}d"));
        lower = upper + 1;
    }
    if let Some(last) = bounds.last() {
        labels.push(format!("{last}d+"));
    }
    labels
}

pub fn backlog(measured: &[MeasuredIncident<'_>], bounds: &[i64]) -> BacklogStats {
    let mut buckets = backlog_bucket_labels(bounds)
        .into_iter()
        .map(|key| KeyCount { key, value: 0 })
        .collect::<Vec<_>>();
    let mut ages = Vec::new();

    for m in measured {
        if !is_open_status(m.incident.status.as_deref()) {
            continue;
        }
        let Some(age) = m.metrics.age_days else {
            continue;
        };
        let idx = bounds
            .iter()
            .position(|upper| age <= *upper)
            .unwrap_or(bounds.len());
        if let Some(bucket) = buckets.get_mut(idx) {
            bucket.value += 1;
        }
        ages.push(age as f64);
    }

    BacklogStats {
        buckets,
        antiguedad_promedio_dias: mean(&ages),
    }
}

fn ratio(hits: i64, total: i64) -> Option<f64> {
    (total > 0).then(|| hits as f64 / total as f64)
}

pub fn sla_compliance(measured: &[MeasuredIncident<'_>]) -> SlaCompliance {
    let (mut atencion_ok, mut atencion_total) = (0, 0);
    let (mut cierre_ok, mut cierre_total) = (0, 0);
    for m in measured {
        if let Some(met) = m.metrics.attention_met {
            atencion_total += 1;
            if met {
                atencion_ok += 1;
            }
        }
        if let Some(met) = m.metrics.closure_met {
            cierre_total += 1;
            if met {
                cierre_ok += 1;
            }
        }
    }
    SlaCompliance {
        atencion_dentro: ratio(atencion_ok, atencion_total),
        cierre_dentro: ratio(cierre_ok, cierre_total),
    }
}

/// Technician ids with at least one assignment, ascending.
pub fn assigned_technician_ids(incidents: &[Incident]) -> Vec<i64> {
    incidents
        .iter()
        .filter_map(|i| i.assigned_technician_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Reduce a snapshot into the dashboard report. Pure: `window` only supplies `now` and the
/// reported timeframe; the caller is responsible for fetching the right incidents.
pub fn aggregate(
    inputs: &DashboardInputs<'_>,
    window: &AggregationWindow,
    settings: &DashboardSettings,
) -> DashboardReport {
    let measured = measure_incidents(inputs.incidents, window.now());
    let (estados, totals) = status_distribution(inputs.incidents);

    let workload = technician_workload(&measured, settings.closed_window_days);

    DashboardReport {
        timeframe_days: window.days(),
        totals,
        categorias: category_distribution(inputs.incidents, settings.top_n),
        estados,
        prioridades: priority_distribution(inputs.incidents),
        proyectos: ProjectStats {
            top_reportes: project_ranking(
                inputs.incidents,
                inputs.housings,
                inputs.projects,
                settings.top_n,
            ),
        },
        tecnicos: technician_rankings(workload, inputs.technicians, settings.top_n),
        viviendas: HousingStats {
            top_reportes: housing_ranking(inputs.incidents, inputs.housings, settings.top_n),
        },
        backlog: backlog(&measured, &settings.backlog_bounds_days),
        sla: sla_compliance(&measured),
    }
}

/// Fetch a fresh snapshot through `repo` and aggregate it.
///
/// Incident and housing fetch failures abort. Project names and technician directory
/// lookups degrade to empty data with a warning.
pub fn build_dashboard<R: DashboardRepository + ?Sized>(
    repo: &R,
    window: &AggregationWindow,
    settings: &DashboardSettings,
) -> Result<DashboardReport, AppError> {
    let incidents = repo.fetch_incidents(window)?;
    let housings = repo.fetch_housings()?;

    let projects = repo.fetch_projects().unwrap_or_else(|e| {
        warn!(code = %e.code, details = ?e.details, "project lookup failed; names left empty");
        Vec::new()
    });

    let technician_ids = assigned_technician_ids(&incidents);
    let technicians = if technician_ids.is_empty() {
        repo.fetch_technicians_by_role(UserRole::Tecnico, settings.top_n)
            .unwrap_or_else(|e| {
                warn!(code = %e.code, details = ?e.details, "fallback technician lookup failed");
                Vec::new()
            })
    } else {
        repo.fetch_technicians(&technician_ids).unwrap_or_else(|e| {
            warn!(
                code = %e.code,
                details = ?e.details,
                technicians = technician_ids.len(),
                "technician lookup failed; names left empty"
            );
            Vec::new()
        })
    };

    let report = aggregate(
        &DashboardInputs {
            incidents: &incidents,
            housings: &housings,
            projects: &projects,
            technicians: &technicians,
        },
        window,
        settings,
    );

    info!(
        days = window.days(),
        incidents = report.totals.incidencias,
        open = report.totals.abiertas,
        "dashboard aggregated"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bounds_produce_documented_labels() {
        assert_eq!(
            backlog_bucket_labels(&[7, 14, 30, 60, 90]),
            vec!["0-7d", "8-14d", "15-30d", "31-60d", "61-90d", "90d+"]
        );
    }

    #[test]
    fn buckets_serialize_in_age_order() {
        let stats = BacklogStats {
            buckets: backlog_bucket_labels(&[7, 14, 30, 60, 90])
                .into_iter()
                .enumerate()
                .map(|(i, key)| KeyCount {
                    key,
                    value: i as i64,
                })
                .collect(),
            antiguedad_promedio_dias: None,
        };
        let json = serde_json::to_string(&stats).expect("json");
        assert_eq!(
            json,
            r#"{"buckets":{"0-7d":0,"8-14d":1,"15-30d":2,"31-60d":3,"61-90d":4,"90d+":5},"antiguedadPromedioDias":null}"#
        );
        let back: BacklogStats = serde_json::from_str(&json).expect("parse");
        assert_eq!(back, stats);
    }

    #[test]
    fn ratio_is_none_without_denominator() {
        assert_eq!(ratio(0, 0), None);
        assert_eq!(ratio(1, 4), Some(0.25));
    }

    #[test]
    fn mean_of_empty_is_none() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 2.0]), Some(1.5));
    }
}
