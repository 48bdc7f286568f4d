use mtgn::env::EnvironmentalSample;
use mtgn::gnss::GeodeticFix;
use mtgn::protocol::*;

fn main() {
    // Worst-case frame: every field present at its widest plausible rendering
    let sample = EnvironmentalSample {
        temperature_c: Field::Available(-40.55),
        pressure_hpa: Field::Available(1084.75),
        humidity_pct: Field::Available(100.0),
        altitude_m: Field::Available(-1013.25),
    };

    let fix = GeodeticFix {
        longitude_deg: Field::Available(-179.999_999),
        latitude_deg: Field::Available(-89.999_999),
        altitude_m: Field::Available(18_287.4),
        dop: Field::Available(99.9),
        epoch_seconds: Field::Available(4_102_444_800),
        satellites_in_use: Field::Available(255),
        satellites_visible: Field::Available(1530),
    };

    let mut encoder = MessageEncoder::new();

    match encoder.encode_data(&sample, &fix) {
        Ok(line) => {
            println!("✅ Data line encoding successful!");
            println!("📏 Line size: {} bytes", line.len());
            println!("🎯 Buffer capacity: {} bytes", MAX_LINE_SIZE);
            println!(
                "📊 Fill ratio: {:.1}%",
                (line.len() as f32 / MAX_LINE_SIZE as f32) * 100.0
            );

            if line.len() <= MAX_LINE_SIZE {
                println!("✅ Worst-case line fits the transmit buffer");
            } else {
                println!("❌ Worst-case line overflows the transmit buffer");
            }

            println!("\n📄 Line:");
            print!("{}", line);
        }
        Err(e) => {
            println!("❌ Encoding failed: {}", e);
        }
    }
}
