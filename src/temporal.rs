//! TIME2 / DATETIME2 / TIMESTAMP2 디코딩
//!
//! 정수부는 big-endian, 뒤에 소수점 자릿수(fsp)에 따라 0~3 바이트의 소수부가 붙습니다.
//! - fsp 0: 0 바이트
//! - fsp 1~2: 1 바이트 (1/100 초)
//! - fsp 3~4: 2 바이트 (1/10000 초)
//! - fsp 5~6: 3 바이트 (마이크로초)

use crate::error::{CdcError, Result};
use byteorder::{BigEndian, ReadBytesExt};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;

const DATETIME2_BIAS: i64 = 0x80_0000_0000;
const TIME2_BIAS: i64 = 0x80_0000;
const TIME2_BIAS_48: i64 = 0x8000_0000_0000;

/// MySQL 날짜/시간 값
///
/// `0000-00-00 00:00:00` 같은 zero date도 표현할 수 있도록 필드 단위로 보관합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MysqlDateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub microsecond: u32,
}

impl MysqlDateTime {
    pub fn is_zero(&self) -> bool {
        *self == MysqlDateTime::default()
    }

    /// 달력상 유효한 값이면 `NaiveDateTime`으로 변환 (zero date는 `None`)
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32)?
            .and_hms_micro_opt(
                self.hour as u32,
                self.minute as u32,
                self.second as u32,
                self.microsecond,
            )
    }

    pub fn from_naive(value: &NaiveDateTime) -> Self {
        MysqlDateTime {
            year: value.year() as u16,
            month: value.month() as u8,
            day: value.day() as u8,
            hour: value.hour() as u8,
            minute: value.minute() as u8,
            second: value.second() as u8,
            microsecond: value.nanosecond() / 1_000,
        }
    }
}

impl fmt::Display for MysqlDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )?;
        if self.microsecond > 0 {
            write!(f, ".{:06}", self.microsecond)?;
        }
        Ok(())
    }
}

/// fsp에 따른 소수부 바이트 수
pub fn fractional_bytes(fsp: u8) -> Result<usize> {
    match fsp {
        0 => Ok(0),
        1 | 2 => Ok(1),
        3 | 4 => Ok(2),
        5 | 6 => Ok(3),
        _ => Err(CdcError::InvalidMetadata(format!(
            "fractional seconds precision {} out of range 0..=6",
            fsp
        ))),
    }
}

/// 소수부를 마이크로초로 읽기
fn read_fraction(cursor: &mut Cursor<&[u8]>, fsp: u8) -> Result<u32> {
    let (raw, limit, scale) = match fractional_bytes(fsp)? {
        0 => return Ok(0),
        1 => (cursor.read_u8()? as u32, 100, 10_000),
        2 => (cursor.read_u16::<BigEndian>()? as u32, 10_000, 100),
        _ => (cursor.read_u24::<BigEndian>()?, 1_000_000, 1),
    };
    if raw >= limit {
        return Err(CdcError::InvalidValue(format!(
            "fractional part {} exceeds precision {}",
            raw, fsp
        )));
    }
    Ok(raw * scale)
}

/// DATETIME2 읽기 (5 바이트 + 소수부)
pub fn read_datetime2(cursor: &mut Cursor<&[u8]>, fsp: u8) -> Result<MysqlDateTime> {
    fractional_bytes(fsp)?;

    let packed = cursor.read_uint::<BigEndian>(5)? as i64 - DATETIME2_BIAS;
    if packed < 0 {
        return Err(CdcError::InvalidValue(format!(
            "negative DATETIME2 value {}",
            packed
        )));
    }
    let microsecond = read_fraction(cursor, fsp)?;

    let ymd = packed >> 17;
    let ym = ymd >> 5;
    let hms = packed & 0x1ffff;

    Ok(MysqlDateTime {
        year: (ym / 13) as u16,
        month: (ym % 13) as u8,
        day: (ymd & 0x1f) as u8,
        hour: (hms >> 12) as u8,
        minute: ((hms >> 6) & 0x3f) as u8,
        second: (hms & 0x3f) as u8,
        microsecond,
    })
}

/// TIMESTAMP2 읽기 (4 바이트 epoch 초 + 소수부), UTC 기준
pub fn read_timestamp2(cursor: &mut Cursor<&[u8]>, fsp: u8) -> Result<MysqlDateTime> {
    fractional_bytes(fsp)?;

    let seconds = cursor.read_u32::<BigEndian>()?;
    let microsecond = read_fraction(cursor, fsp)?;

    if seconds == 0 {
        return Ok(MysqlDateTime {
            microsecond,
            ..MysqlDateTime::default()
        });
    }

    let instant = DateTime::from_timestamp(seconds as i64, microsecond * 1_000).ok_or_else(|| {
        CdcError::InvalidValue(format!("TIMESTAMP2 {} out of range", seconds))
    })?;
    Ok(MysqlDateTime::from_naive(&instant.naive_utc()))
}

/// TIME2 읽기 (3 바이트 + 소수부), 부호 있는 시간 길이
pub fn read_time2(cursor: &mut Cursor<&[u8]>, fsp: u8) -> Result<Duration> {
    let packed: i64 = match fractional_bytes(fsp)? {
        0 => {
            let int_part = cursor.read_uint::<BigEndian>(3)? as i64 - TIME2_BIAS;
            int_part << 24
        }
        1 => {
            let mut int_part = cursor.read_uint::<BigEndian>(3)? as i64 - TIME2_BIAS;
            let mut frac = cursor.read_u8()? as i64;
            if int_part < 0 && frac != 0 {
                // 음수 값은 소수부를 빌려서 저장됨
                int_part += 1;
                frac -= 0x100;
            }
            (int_part << 24) + frac * 10_000
        }
        2 => {
            let mut int_part = cursor.read_uint::<BigEndian>(3)? as i64 - TIME2_BIAS;
            let mut frac = cursor.read_u16::<BigEndian>()? as i64;
            if int_part < 0 && frac != 0 {
                int_part += 1;
                frac -= 0x10000;
            }
            (int_part << 24) + frac * 100
        }
        _ => cursor.read_uint::<BigEndian>(6)? as i64 - TIME2_BIAS_48,
    };

    let negative = packed < 0;
    let magnitude = packed.abs();
    let hms = magnitude >> 24;
    let microsecond = magnitude & 0xff_ffff;

    let hour = (hms >> 12) & 0x3ff;
    let minute = (hms >> 6) & 0x3f;
    let second = hms & 0x3f;
    if minute > 59 || second > 59 || microsecond >= 1_000_000 {
        return Err(CdcError::InvalidValue(format!(
            "malformed TIME2 value {:02}:{:02}:{:02}.{:06}",
            hour, minute, second, microsecond
        )));
    }

    let total = ((hour * 3600 + minute * 60 + second) * 1_000_000) + microsecond;
    Ok(Duration::microseconds(if negative { -total } else { total }))
}
