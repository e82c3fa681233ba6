//! Date and time arithmetic and component extraction.

use anyhow::{bail, Result};

use super::{required_array, CompileContext, ExecContext, Operand, Transformation, TransformationRegistry};
use crate::array::datetime::from_ticks;
use crate::array::{Array, DType, DTypeKind, DateComponent, TimeUnit, Value};

/// Datetimes as-is; strings parsed with the unit inferred from their precision.
fn as_datetimes(array: Array) -> Result<Array> {
    match array.dtype().kind() {
        DTypeKind::DateTime => Ok(array),
        DTypeKind::Str => array.astype(&DType::DateTime(TimeUnit::Generic)),
        _ => bail!("Expected datetimes or datetime strings, got dtype '{}'", array.dtype()),
    }
}

#[derive(Debug)]
enum Bound {
    Initial(Operand),
    End(Operand),
}

/// `data - initial_datetime` or `end_datetime - data`, optionally converted
/// to `compute_unit`.
#[derive(Debug)]
pub struct DateTimeDifference {
    bound: Bound,
    compute_unit: Option<TimeUnit>,
}

impl DateTimeDifference {
    pub fn new(initial: Option<Operand>, end: Option<Operand>, compute_unit: Option<&str>) -> Result<Self> {
        let bound = match (initial, end) {
            (Some(initial), None) => Bound::Initial(initial),
            (None, Some(end)) => Bound::End(end),
            _ => bail!("Only one of 'initial_datetime' or 'end_datetime' should be set!"),
        };
        let compute_unit = compute_unit.map(TimeUnit::parse).transpose()?;
        Ok(Self { bound, compute_unit })
    }
}

impl Transformation for DateTimeDifference {
    fn name(&self) -> &str {
        "DateTimeDifference"
    }

    fn expects_data(&self) -> bool {
        true
    }

    fn compile(&mut self, ctx: &mut CompileContext<'_>) -> Result<()> {
        match &mut self.bound {
            Bound::Initial(operand) | Bound::End(operand) => operand.compile(ctx),
        }
    }

    fn execute(&self, data: Option<Value>, ctx: &ExecContext<'_>) -> Result<Value> {
        let data = as_datetimes(required_array(data, self.name())?)?;
        let difference = match &self.bound {
            Bound::Initial(initial) => data.sub(&as_datetimes(initial.resolve_array(ctx)?)?)?,
            Bound::End(end) => as_datetimes(end.resolve_array(ctx)?)?.sub(&data)?,
        };
        let result = match self.compute_unit {
            Some(unit) => difference.astype(&DType::TimeDelta(unit))?,
            None => difference,
        };
        Ok(result.into())
    }
}

/// Shift datetimes by a fixed number of units.
#[derive(Debug)]
pub struct DateTimeShift {
    delta: i64,
    unit: TimeUnit,
    subtract: bool,
}

impl DateTimeShift {
    pub fn add(delta: i64, unit: &str) -> Result<Self> {
        Self::new(delta, unit, false)
    }

    pub fn subtract(delta: i64, unit: &str) -> Result<Self> {
        Self::new(delta, unit, true)
    }

    fn new(delta: i64, unit: &str, subtract: bool) -> Result<Self> {
        Ok(Self {
            delta,
            unit: TimeUnit::parse(unit)?,
            subtract,
        })
    }
}

impl Transformation for DateTimeShift {
    fn name(&self) -> &str {
        if self.subtract {
            "DateTimeSubtract"
        } else {
            "DateTimeAdd"
        }
    }

    fn expects_data(&self) -> bool {
        true
    }

    fn execute(&self, data: Option<Value>, _ctx: &ExecContext<'_>) -> Result<Value> {
        let data = as_datetimes(required_array(data, self.name())?)?;
        let delta = Array::timedelta64(vec![self.delta], self.unit)?.with_shape(Vec::new())?;
        let shifted = if self.subtract {
            data.sub(&delta)?
        } else {
            data.add(&delta)?
        };
        Ok(shifted.into())
    }
}

/// One calendar component of every datetime, as `int64`.
#[derive(Debug)]
pub struct DateTimeExtract {
    component: DateComponent,
}

impl DateTimeExtract {
    pub fn new(component: &str) -> Result<Self> {
        Ok(Self {
            component: DateComponent::parse(component)?,
        })
    }
}

impl Transformation for DateTimeExtract {
    fn name(&self) -> &str {
        "DateTimeExtract"
    }

    fn expects_data(&self) -> bool {
        true
    }

    fn execute(&self, data: Option<Value>, _ctx: &ExecContext<'_>) -> Result<Value> {
        let data = as_datetimes(required_array(data, self.name())?)?;
        let unit = data.dtype().time_unit().unwrap_or(TimeUnit::Day);
        let components = data
            .as_i64_vec()?
            .into_iter()
            .map(|ticks| Ok(self.component.extract(&from_ticks(ticks, unit)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Array::from_i64(components)
            .with_shape(data.shape().to_vec())?
            .into())
    }
}

pub(crate) fn register_builtins(registry: &mut TransformationRegistry) {
    registry.add(
        "datetime_diff",
        "DateTimeDifference",
        "Time since initial_datetime or until end_datetime",
        |args| {
            let initial = args.take_operand("initial_datetime")?;
            let end = args.take_operand("end_datetime")?;
            let unit = args.take_string("compute_unit")?;
            Ok(Box::new(DateTimeDifference::new(initial, end, unit.as_deref())?))
        },
    );
    registry.add("datetime_add", "DateTimeAdd", "Shift datetimes forward", |args| {
        let delta = args.require_i64("time_delta")?;
        let unit = args.require_string("compute_unit")?;
        Ok(Box::new(DateTimeShift::add(delta, &unit)?))
    });
    registry.add("datetime_sub", "DateTimeSubtract", "Shift datetimes backward", |args| {
        let delta = args.require_i64("time_delta")?;
        let unit = args.require_string("compute_unit")?;
        Ok(Box::new(DateTimeShift::subtract(delta, &unit)?))
    });
    registry.add("datetime_extract", "DateTimeExtract", "Year, month, day, ... of datetimes", |args| {
        Ok(Box::new(DateTimeExtract::new(&args.require_string("component")?)?))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn days(values: &[&str]) -> Array {
        Array::datetime64(values, TimeUnit::Day).unwrap()
    }

    fn run(step: &dyn Transformation, data: Array) -> Array {
        step.execute(Some(data.into()), &ExecContext::detached())
            .unwrap()
            .into_array()
            .unwrap()
    }

    fn text(array: &Array) -> Vec<String> {
        (0..array.len()).map(|i| array.format_element(i)).collect()
    }

    #[test]
    fn test_difference_from_initial() {
        let step = DateTimeDifference::new(Some(Operand::Name("2023-01-01".into())), None, Some("D")).unwrap();
        let out = run(&step, days(&["2023-01-05", "2023-01-10"]));
        assert_eq!(out.dtype(), DType::TimeDelta(TimeUnit::Day));
        assert_eq!(out.as_i64_vec().unwrap(), vec![4, 9]);
    }

    #[test]
    fn test_difference_to_end() {
        let step = DateTimeDifference::new(None, Some(Operand::Name("2023-01-10".into())), Some("D")).unwrap();
        let out = run(&step, days(&["2023-01-05", "2023-01-06"]));
        assert_eq!(out.as_i64_vec().unwrap(), vec![5, 4]);
    }

    #[test]
    fn test_difference_in_seconds() {
        let step = DateTimeDifference::new(Some(Operand::Name("2023-01-01".into())), None, Some("s")).unwrap();
        let out = run(&step, days(&["2023-01-05", "2023-01-10"]));
        assert_eq!(out.as_i64_vec().unwrap(), vec![345600, 777600]);
    }

    #[test]
    fn test_difference_argument_errors() {
        let err = DateTimeDifference::new(
            Some(Operand::Name("2023-01-01".into())),
            Some(Operand::Name("2023-01-05".into())),
            None,
        )
        .unwrap_err();
        assert!(err
            .to_string()
            .contains("Only one of 'initial_datetime' or 'end_datetime' should be set!"));
        assert!(DateTimeDifference::new(None, None, None).is_err());

        let err = DateTimeDifference::new(Some(Operand::Name("2023-01-01".into())), None, Some("invalid")).unwrap_err();
        assert!(err.to_string().contains("compute_unit= invalid is not a valid code!"));
    }

    #[test]
    fn test_difference_accepts_strings() {
        let step = DateTimeDifference::new(Some(Operand::Name("2023-01-01".into())), None, Some("D")).unwrap();
        let out = run(&step, Array::from_strs(&["2023-01-03"]));
        assert_eq!(out.as_i64_vec().unwrap(), vec![2]);
    }

    #[test]
    fn test_add_and_subtract() {
        let add = DateTimeShift::add(2, "D").unwrap();
        assert_eq!(text(&run(&add, days(&["2024-09-10", "2024-09-12"]))), vec!["2024-09-12", "2024-09-14"]);

        let hours = Array::datetime64(&["2024-09-10T12", "2024-09-12T06"], TimeUnit::Hour).unwrap();
        let add_hours = DateTimeShift::add(5, "h").unwrap();
        assert_eq!(text(&run(&add_hours, hours.clone())), vec!["2024-09-10T17", "2024-09-12T11"]);

        let sub_hours = DateTimeShift::subtract(5, "h").unwrap();
        assert_eq!(sub_hours.name(), "DateTimeSubtract");
        assert_eq!(text(&run(&sub_hours, hours)), vec!["2024-09-10T07", "2024-09-12T01"]);
    }

    #[test]
    fn test_extract_components() {
        let data = days(&["2024-09-10", "2023-05-15"]);
        let year = DateTimeExtract::new("Y").unwrap();
        assert_eq!(run(&year, data.clone()).as_i64_vec().unwrap(), vec![2024, 2023]);
        let month = DateTimeExtract::new("M").unwrap();
        assert_eq!(run(&month, data.clone()).as_i64_vec().unwrap(), vec![9, 5]);
        let day = DateTimeExtract::new("D").unwrap();
        assert_eq!(run(&day, data).as_i64_vec().unwrap(), vec![10, 15]);

        let seconds = Array::datetime64(&["2024-09-10 12:30:45", "2023-05-15 13:20:15"], TimeUnit::Second).unwrap();
        let hour = DateTimeExtract::new("h").unwrap();
        assert_eq!(run(&hour, seconds.clone()).as_i64_vec().unwrap(), vec![12, 13]);
        let minute = DateTimeExtract::new("m").unwrap();
        assert_eq!(run(&minute, seconds).as_i64_vec().unwrap(), vec![30, 20]);
    }

    #[test]
    fn test_extract_invalid_component() {
        assert!(DateTimeExtract::new("Q").is_err());
    }
}
