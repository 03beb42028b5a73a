use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{HashMap, HashSet};

/// Minimum grade that counts as a pass, before and after decision points.
pub const PASS_MARK: i32 = 50;

const EXEMPT_PURSUIT_MIN: i32 = 85;
const EXEMPT_MID_YEAR_MIN: f64 = 75.0;

const DEFAULT_MINISTERIAL_DECISION_POINTS: u32 = 5;
const DEFAULT_MINISTERIAL_SUPPLEMENTARY_SUBJECTS: u32 = 3;

/// Round-half-up used on every derived grade: `Int(x + 0.5)`.
pub fn round_half_up(x: f64) -> i32 {
    (x + 0.5).floor() as i32
}

/// A score is usable only when it is finite and inside [0, 100].
pub fn sanitize_score(v: f64) -> Option<f64> {
    if v.is_finite() && (0.0..=100.0).contains(&v) {
        Some(v)
    } else {
        None
    }
}

/// Decode a score the way the grade store hands it over: numbers or numeric
/// strings. Anything else is "not entered".
pub fn score_from_value(v: &serde_json::Value) -> Option<f64> {
    let n = match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    sanitize_score(n)
}

fn lenient_score<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(score_from_value(&raw))
}

/// A `null` or non-object record is a subject with nothing entered yet.
fn lenient_grades<'de, D>(deserializer: D) -> Result<HashMap<String, SubjectGrade>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    let serde_json::Value::Object(records) = raw else {
        return Ok(HashMap::new());
    };
    Ok(records
        .into_iter()
        .map(|(name, record)| {
            let grade = if record.is_object() {
                serde_json::from_value(record).unwrap_or_default()
            } else {
                SubjectGrade::default()
            };
            (name, grade)
        })
        .collect())
}

fn lenient_stage<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        _ => Ok(String::new()),
    }
}

/// Raw scores for one (student, subject) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubjectGrade {
    #[serde(deserialize_with = "lenient_score")]
    pub first_term: Option<f64>,
    #[serde(deserialize_with = "lenient_score")]
    pub mid_year: Option<f64>,
    #[serde(deserialize_with = "lenient_score")]
    pub second_term: Option<f64>,
    #[serde(deserialize_with = "lenient_score")]
    pub final_exam_1st: Option<f64>,
    #[serde(deserialize_with = "lenient_score")]
    pub final_exam_2nd: Option<f64>,
    #[serde(deserialize_with = "lenient_score")]
    pub october: Option<f64>,
    #[serde(deserialize_with = "lenient_score")]
    pub november: Option<f64>,
    #[serde(deserialize_with = "lenient_score")]
    pub december: Option<f64>,
    #[serde(deserialize_with = "lenient_score")]
    pub january: Option<f64>,
    #[serde(deserialize_with = "lenient_score")]
    pub february: Option<f64>,
    #[serde(deserialize_with = "lenient_score")]
    pub march: Option<f64>,
    #[serde(deserialize_with = "lenient_score")]
    pub april: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentGrades {
    #[serde(default, deserialize_with = "lenient_grades")]
    pub grades: HashMap<String, SubjectGrade>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolSettings {
    pub decision_points: u32,
    pub supplementary_subjects_count: u32,
}

impl Default for SchoolSettings {
    fn default() -> Self {
        Self {
            decision_points: 5,
            supplementary_subjects_count: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StageCategory {
    /// Primary stages whose term grades come from monthly scores.
    Monthly,
    /// Terminal exam-board stages; decisions apply to the annual pursuit.
    Ministerial,
    Standard,
}

impl StageCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            StageCategory::Monthly => "monthly",
            StageCategory::Ministerial => "ministerial",
            StageCategory::Standard => "standard",
        }
    }
}

/// Stage names that select the monthly and ministerial policies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRules {
    pub monthly_stages: Vec<String>,
    pub ministerial_stages: Vec<String>,
}

impl Default for StageRules {
    fn default() -> Self {
        Self {
            monthly_stages: vec!["الاول الابتدائي".into(), "الثاني الابتدائي".into()],
            ministerial_stages: vec![
                "السادس الابتدائي".into(),
                "الثالث المتوسط".into(),
                "السادس الاعدادي".into(),
            ],
        }
    }
}

impl StageRules {
    pub fn classify(&self, stage: &str) -> StageCategory {
        let stage = stage.trim();
        if stage.is_empty() {
            return StageCategory::Standard;
        }
        if self.monthly_stages.iter().any(|s| s.trim() == stage) {
            StageCategory::Monthly
        } else if self.ministerial_stages.iter().any(|s| s.trim() == stage) {
            StageCategory::Ministerial
        } else {
            StageCategory::Standard
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassPolicy {
    #[serde(default, deserialize_with = "lenient_stage")]
    pub stage: String,
    /// Pins the category instead of looking the stage name up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<StageCategory>,
    #[serde(default)]
    pub ministerial_decision_points: Option<u32>,
    #[serde(default)]
    pub ministerial_supplementary_subjects: Option<u32>,
}

impl ClassPolicy {
    pub fn category(&self, rules: &StageRules) -> StageCategory {
        self.category.unwrap_or_else(|| rules.classify(&self.stage))
    }
}

/// Derived grades for one subject.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculatedGrade {
    pub annual_pursuit: Option<i32>,
    pub final_grade_1st: Option<i32>,
    pub final_grade_with_decision: Option<i32>,
    pub decision_applied: u32,
    pub final_grade_2nd: Option<i32>,
    pub is_exempt: bool,
    pub annual_pursuit_with_decision: Option<i32>,
    pub decision_applied_on_pursuit: u32,
}

impl CalculatedGrade {
    /// The first-round value the pass mark is checked against.
    pub fn adjusted(&self, category: StageCategory) -> Option<i32> {
        match category {
            StageCategory::Ministerial => self.annual_pursuit_with_decision,
            _ => self.final_grade_with_decision,
        }
    }

    pub fn fails_first_round(&self, category: StageCategory) -> bool {
        !self.is_exempt
            && self
                .adjusted(category)
                .map(|v| v < PASS_MARK)
                .unwrap_or(false)
    }

    /// A failing subject with no second-round grade yet stays failing.
    pub fn fails_second_round(&self, category: StageCategory) -> bool {
        match self.final_grade_2nd {
            Some(v) => v < PASS_MARK,
            None => self.fails_first_round(category),
        }
    }

    pub fn decision_points_granted(&self) -> u32 {
        self.decision_applied + self.decision_applied_on_pursuit
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResultStatus {
    Pending,
    Pass,
    Supplementary,
    Fail,
    Qualified,
    QualifiedByDecision,
    NotQualified,
}

impl ResultStatus {
    pub const ALL: [ResultStatus; 7] = [
        ResultStatus::Pending,
        ResultStatus::Pass,
        ResultStatus::Supplementary,
        ResultStatus::Fail,
        ResultStatus::Qualified,
        ResultStatus::QualifiedByDecision,
        ResultStatus::NotQualified,
    ];

    /// Label printed on report cards.
    pub fn label(self) -> &'static str {
        match self {
            ResultStatus::Pending => "النتيجة غير مكتملة",
            ResultStatus::Pass => "ناجح",
            ResultStatus::Supplementary => "مكمل",
            ResultStatus::Fail => "راسب",
            ResultStatus::Qualified => "مؤهل",
            ResultStatus::QualifiedByDecision => "مؤهل بقرار",
            ResultStatus::NotQualified => "غير مؤهل",
        }
    }

    fn reports_count(self) -> bool {
        matches!(
            self,
            ResultStatus::Supplementary
                | ResultStatus::Fail
                | ResultStatus::QualifiedByDecision
                | ResultStatus::NotQualified
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentResult {
    pub status: ResultStatus,
    pub message: String,
    pub failing_count: u32,
}

impl StudentResult {
    fn new(status: ResultStatus, failing: u32) -> Self {
        if status.reports_count() {
            Self {
                status,
                message: format!("{} - عدد المواد: {}", status.label(), failing),
                failing_count: failing,
            }
        } else {
            Self {
                status,
                message: status.label().to_string(),
                failing_count: 0,
            }
        }
    }
}

fn serialize_subject_map<S>(v: &[(String, CalculatedGrade)], s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.collect_map(v.iter().map(|(name, grade)| (name, grade)))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub category: StageCategory,
    #[serde(serialize_with = "serialize_subject_map")]
    pub per_subject: Vec<(String, CalculatedGrade)>,
    pub result: StudentResult,
}

impl Evaluation {
    pub fn grade(&self, subject: &str) -> Option<&CalculatedGrade> {
        self.per_subject
            .iter()
            .find(|(name, _)| name == subject)
            .map(|(_, g)| g)
    }
}

fn entered(v: Option<f64>) -> Option<f64> {
    v.and_then(sanitize_score)
}

fn rounded_mean(values: &[Option<f64>]) -> Option<i32> {
    let mut sum = 0.0_f64;
    for v in values {
        sum += entered(*v)?;
    }
    Some(round_half_up(sum / values.len() as f64))
}

/// Steps run independently per subject: terms, pursuit, exemption, first
/// final grade and the second-round grade.
fn derive_subject(raw: &SubjectGrade, category: StageCategory) -> CalculatedGrade {
    let (first_term, second_term) = if category == StageCategory::Monthly {
        let first = rounded_mean(&[raw.october, raw.november, raw.december, raw.january])
            .map(f64::from)
            .or_else(|| entered(raw.first_term));
        let second = rounded_mean(&[raw.february, raw.march, raw.april])
            .map(f64::from)
            .or_else(|| entered(raw.second_term));
        (first, second)
    } else {
        (entered(raw.first_term), entered(raw.second_term))
    };
    let mid_year = entered(raw.mid_year);

    let annual_pursuit = match (first_term, mid_year, second_term) {
        (Some(a), Some(b), Some(c)) => Some(round_half_up((a + b + c) / 3.0)),
        _ => None,
    };

    let is_exempt = match (annual_pursuit, mid_year) {
        (Some(p), Some(m)) => p >= EXEMPT_PURSUIT_MIN && m >= EXEMPT_MID_YEAR_MIN,
        _ => false,
    };

    let final_grade_1st = match (annual_pursuit, entered(raw.final_exam_1st)) {
        (Some(p), _) if is_exempt => Some(p),
        (Some(p), Some(exam)) => Some(round_half_up((f64::from(p) + exam) / 2.0)),
        (Some(p), None) => Some(round_half_up(f64::from(p) / 2.0)),
        (None, _) => None,
    };

    let final_grade_2nd = match (annual_pursuit, entered(raw.final_exam_2nd)) {
        (Some(p), Some(exam)) => Some(round_half_up((f64::from(p) + exam) / 2.0)),
        _ => None,
    };

    CalculatedGrade {
        annual_pursuit,
        final_grade_1st,
        final_grade_with_decision: final_grade_1st,
        decision_applied: 0,
        final_grade_2nd,
        is_exempt,
        annual_pursuit_with_decision: annual_pursuit,
        decision_applied_on_pursuit: 0,
    }
}

/// First-fit sweep in list order. A subject whose shortfall exceeds what is
/// left gets nothing; later subjects are still considered.
pub fn allocate_decision_points(values: &[Option<i32>], pool: u32) -> Vec<u32> {
    let mut remaining = i64::from(pool);
    let mut granted = Vec::with_capacity(values.len());
    for v in values {
        let shortfall = match v {
            Some(v) if *v < PASS_MARK => i64::from(PASS_MARK - *v),
            _ => {
                granted.push(0);
                continue;
            }
        };
        if shortfall <= remaining {
            remaining -= shortfall;
            granted.push(shortfall as u32);
        } else {
            granted.push(0);
        }
    }
    granted
}

#[cfg(test)]
pub fn evaluate(
    student: &StudentGrades,
    subjects: &[String],
    settings: &SchoolSettings,
    policy: &ClassPolicy,
) -> Evaluation {
    evaluate_with_rules(student, subjects, settings, policy, &StageRules::default())
}

pub fn evaluate_with_rules(
    student: &StudentGrades,
    subjects: &[String],
    settings: &SchoolSettings,
    policy: &ClassPolicy,
    rules: &StageRules,
) -> Evaluation {
    let category = policy.category(rules);
    let empty = SubjectGrade::default();

    let mut seen: HashSet<&str> = HashSet::new();
    let mut per_subject: Vec<(String, CalculatedGrade)> = Vec::with_capacity(subjects.len());
    for name in subjects {
        if !seen.insert(name.as_str()) {
            continue;
        }
        let raw = student.grades.get(name).unwrap_or(&empty);
        per_subject.push((name.clone(), derive_subject(raw, category)));
    }

    // Decision points run only after every subject has its first-round values.
    if category == StageCategory::Ministerial {
        let pool = policy
            .ministerial_decision_points
            .unwrap_or(DEFAULT_MINISTERIAL_DECISION_POINTS);
        let values: Vec<Option<i32>> = per_subject.iter().map(|(_, g)| g.annual_pursuit).collect();
        for ((_, g), points) in per_subject
            .iter_mut()
            .zip(allocate_decision_points(&values, pool))
        {
            if points > 0 {
                g.annual_pursuit_with_decision = Some(PASS_MARK);
                g.decision_applied_on_pursuit = points;
            }
        }
    } else {
        let values: Vec<Option<i32>> = per_subject.iter().map(|(_, g)| g.final_grade_1st).collect();
        for ((_, g), points) in per_subject
            .iter_mut()
            .zip(allocate_decision_points(&values, settings.decision_points))
        {
            if points > 0 {
                g.final_grade_with_decision = Some(PASS_MARK);
                g.decision_applied = points;
            }
        }
    }

    let result = determine_result(&per_subject, category, settings, policy);
    Evaluation {
        category,
        per_subject,
        result,
    }
}

fn determine_result(
    per_subject: &[(String, CalculatedGrade)],
    category: StageCategory,
    settings: &SchoolSettings,
    policy: &ClassPolicy,
) -> StudentResult {
    let mut failing_1st = 0_u32;
    let mut failing_2nd = 0_u32;
    let mut any_second_entered = false;
    let mut any_computed = false;

    for (_, g) in per_subject {
        if g.adjusted(category).is_some() {
            any_computed = true;
        }
        if g.fails_first_round(category) {
            failing_1st += 1;
        }
        if g.final_grade_2nd.is_some() {
            any_second_entered = true;
        }
        if g.fails_second_round(category) {
            failing_2nd += 1;
        }
    }

    // Second round is terminal: no supplementary tier after it.
    if any_second_entered {
        return if failing_2nd == 0 {
            StudentResult::new(ResultStatus::Pass, 0)
        } else {
            StudentResult::new(ResultStatus::Fail, failing_2nd)
        };
    }

    // Nothing entered anywhere yet: report pending rather than a vacuous pass.
    if !any_computed {
        return StudentResult::new(ResultStatus::Pending, 0);
    }

    if category == StageCategory::Ministerial {
        let limit = policy
            .ministerial_supplementary_subjects
            .unwrap_or(DEFAULT_MINISTERIAL_SUPPLEMENTARY_SUBJECTS);
        let status = if failing_1st == 0 {
            ResultStatus::Qualified
        } else if failing_1st <= limit {
            ResultStatus::QualifiedByDecision
        } else {
            ResultStatus::NotQualified
        };
        StudentResult::new(status, failing_1st)
    } else {
        let status = if failing_1st == 0 {
            ResultStatus::Pass
        } else if failing_1st <= settings.supplementary_subjects_count {
            ResultStatus::Supplementary
        } else {
            ResultStatus::Fail
        };
        StudentResult::new(status, failing_1st)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectSummary {
    pub subject: String,
    pub evaluated_count: u32,
    pub failing_1st_count: u32,
    pub failing_2nd_count: u32,
    pub exempt_count: u32,
    pub decision_points_granted: u32,
}

fn serialize_status_counts<S>(v: &[(ResultStatus, u32)], s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.collect_map(v.iter().map(|(status, n)| (status, n)))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSummary {
    pub student_count: u32,
    #[serde(serialize_with = "serialize_status_counts")]
    pub status_counts: Vec<(ResultStatus, u32)>,
    pub per_subject: Vec<SubjectSummary>,
}

impl ClassSummary {
    pub fn count(&self, status: ResultStatus) -> u32 {
        self.status_counts
            .iter()
            .find(|(s, _)| *s == status)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }
}

/// Class-wide statistics over already-evaluated students.
pub fn summarize_class(subjects: &[String], evaluations: &[Evaluation]) -> ClassSummary {
    let mut status_counts: Vec<(ResultStatus, u32)> =
        ResultStatus::ALL.iter().map(|s| (*s, 0)).collect();
    for e in evaluations {
        if let Some(entry) = status_counts.iter_mut().find(|(s, _)| *s == e.result.status) {
            entry.1 += 1;
        }
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut per_subject: Vec<SubjectSummary> = Vec::new();
    for name in subjects {
        if !seen.insert(name.as_str()) {
            continue;
        }
        let mut summary = SubjectSummary {
            subject: name.clone(),
            ..SubjectSummary::default()
        };
        for e in evaluations {
            let Some(g) = e.grade(name) else {
                continue;
            };
            if g.adjusted(e.category).is_some() {
                summary.evaluated_count += 1;
            }
            if g.fails_first_round(e.category) {
                summary.failing_1st_count += 1;
            }
            if g.fails_second_round(e.category) {
                summary.failing_2nd_count += 1;
            }
            if g.is_exempt {
                summary.exempt_count += 1;
            }
            summary.decision_points_granted += g.decision_points_granted();
        }
        per_subject.push(summary);
    }

    ClassSummary {
        student_count: u32::try_from(evaluations.len()).unwrap_or(u32::MAX),
        status_counts,
        per_subject,
    }
}
