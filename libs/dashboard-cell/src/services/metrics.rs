use sqlx::{QueryBuilder, Sqlite};
use tracing::{debug, info, instrument};

use shared_database::Database;

use crate::models::{
    summarize, DashboardError, DashboardFilter, DashboardQuery, DashboardReport, DoctorRanking, IdleDoctor, Kpis,
    PatientRanking, SpecialtyCount, Timeline, TimelineGrouping, TimelinePoint, RANKING_LIMIT,
};

const FILTERED_APPOINTMENTS: &str = " FROM appointments a JOIN doctors d ON a.doctor_code = d.code";

pub struct DashboardService {
    db: Database,
}

impl DashboardService {
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    #[instrument(skip(self))]
    pub async fn build_report(&self, query: DashboardQuery) -> Result<DashboardReport, DashboardError> {
        let filter = DashboardFilter::from_query(&query)?;
        let grouping = query.group_by.unwrap_or_default();

        let kpis = self.kpis(&filter).await?;
        let top_doctors = self.top_doctors(&filter).await?;
        let top_patients = self.top_patients(&filter).await?;
        let specialties = self.specialty_breakdown(&filter).await?;
        let timeline = self.timeline(&filter, grouping).await?;
        let idle_doctors = self.idle_doctors(&filter).await?;

        info!(
            total = kpis.total_appointments,
            idle = idle_doctors.len(),
            "Dashboard computed for {}..{}",
            filter.from,
            filter.to
        );

        Ok(DashboardReport {
            filter,
            kpis,
            top_doctors,
            top_patients,
            specialties,
            timeline,
            idle_doctors,
        })
    }

    pub async fn kpis(&self, filter: &DashboardFilter) -> Result<Kpis, DashboardError> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*), COUNT(DISTINCT a.patient_cpf)");
        builder.push(FILTERED_APPOINTMENTS);
        push_filter(&mut builder, filter);

        let (total_appointments, unique_patients) = builder
            .build_query_as::<(i64, i64)>()
            .fetch_one(self.db.pool())
            .await?;

        // Doctor headcount ignores the filter.
        let total_doctors = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM doctors")
            .fetch_one(self.db.pool())
            .await?;

        let average_per_doctor = if total_doctors > 0 {
            total_appointments as f64 / total_doctors as f64
        } else {
            0.0
        };

        Ok(Kpis {
            total_appointments,
            total_doctors,
            unique_patients,
            average_per_doctor,
        })
    }

    pub async fn top_doctors(&self, filter: &DashboardFilter) -> Result<Vec<DoctorRanking>, DashboardError> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT d.code, d.name, d.specialty, COUNT(a.id) AS total");
        builder.push(FILTERED_APPOINTMENTS);
        push_filter(&mut builder, filter);
        builder
            .push(" GROUP BY d.code, d.name, d.specialty ORDER BY total DESC, d.name ASC LIMIT ")
            .push_bind(RANKING_LIMIT);

        Ok(builder
            .build_query_as::<DoctorRanking>()
            .fetch_all(self.db.pool())
            .await?)
    }

    pub async fn top_patients(&self, filter: &DashboardFilter) -> Result<Vec<PatientRanking>, DashboardError> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT p.cpf, p.name, COUNT(a.id) AS total");
        builder.push(FILTERED_APPOINTMENTS);
        builder.push(" JOIN patients p ON a.patient_cpf = p.cpf");
        push_filter(&mut builder, filter);
        builder
            .push(" GROUP BY p.cpf, p.name ORDER BY total DESC, p.name ASC LIMIT ")
            .push_bind(RANKING_LIMIT);

        Ok(builder
            .build_query_as::<PatientRanking>()
            .fetch_all(self.db.pool())
            .await?)
    }

    pub async fn specialty_breakdown(&self, filter: &DashboardFilter) -> Result<Vec<SpecialtyCount>, DashboardError> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT d.specialty, COUNT(a.id) AS total");
        builder.push(FILTERED_APPOINTMENTS);
        push_filter(&mut builder, filter);
        builder.push(" GROUP BY d.specialty ORDER BY total DESC, d.specialty ASC");

        Ok(builder
            .build_query_as::<SpecialtyCount>()
            .fetch_all(self.db.pool())
            .await?)
    }

    pub async fn timeline(
        &self,
        filter: &DashboardFilter,
        grouping: TimelineGrouping,
    ) -> Result<Timeline, DashboardError> {
        debug!("Building {:?} timeline", grouping);

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT strftime(");
        builder
            .push_bind(grouping.strftime_pattern())
            .push(", a.scheduled_at) AS period, COUNT(*) AS total");
        builder.push(FILTERED_APPOINTMENTS);
        push_filter(&mut builder, filter);
        builder.push(" GROUP BY period ORDER BY period ASC");

        let points = builder
            .build_query_as::<TimelinePoint>()
            .fetch_all(self.db.pool())
            .await?;
        let stats = summarize(&points);

        Ok(Timeline {
            grouping,
            points,
            stats,
        })
    }

    /// Doctors without a single appointment in the date range, whatever their specialty.
    pub async fn idle_doctors(&self, filter: &DashboardFilter) -> Result<Vec<IdleDoctor>, DashboardError> {
        let doctors = sqlx::query_as::<_, IdleDoctor>(
            "SELECT d.code, d.name, d.specialty, d.email FROM doctors d \
             WHERE NOT EXISTS ( \
                 SELECT 1 FROM appointments a \
                 WHERE a.doctor_code = d.code AND date(a.scheduled_at) BETWEEN ? AND ? \
             ) \
             ORDER BY d.name ASC",
        )
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(self.db.pool())
        .await?;

        Ok(doctors)
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &DashboardFilter) {
    builder
        .push(" WHERE date(a.scheduled_at) BETWEEN ")
        .push_bind(filter.from)
        .push(" AND ")
        .push_bind(filter.to);

    if let Some(specialty) = &filter.specialty {
        builder.push(" AND d.specialty = ").push_bind(specialty.clone());
    }
}
