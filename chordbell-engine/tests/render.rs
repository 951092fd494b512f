//! End-to-end block rendering through `Engine<ChordSynth>`.

use chordbell_core::dsp::TAU;
use chordbell_engine::{
    Block, ChordEngine, EngineError, EngineState, MidiEvent, RemovalPolicy, SynthConfig, VoiceState, Waveform,
    STATUS_CONTINUE,
};

const SR: f32 = 48_000.0;

fn engine(config: SynthConfig) -> ChordEngine {
    ChordEngine::with_config(&config).unwrap()
}

fn midi(events: &[MidiEvent]) -> Vec<u8> {
    events.iter().flat_map(MidiEvent::encode).collect()
}

fn render(engine: &mut ChordEngine, buf: &mut [f32], channels: usize, midi: &[u8]) -> Result<i32, EngineError> {
    let mut block = Block::new(buf, channels, SR, midi);
    engine.render(&mut block)
}

#[test]
fn idle_engine_renders_silence() {
    let mut e = engine(SynthConfig::default());
    let mut buf = vec![1.0f32; 512];
    assert_eq!(render(&mut e, &mut buf, 2, &[]), Ok(STATUS_CONTINUE));
    assert!(buf.iter().all(|&s| s == 0.0));
    assert_eq!(e.state(), EngineState::Idle);
}

#[test]
fn one_note_on_stamps_four_fresh_voices() {
    let mut e = engine(SynthConfig::default());
    let mut buf: Vec<f32> = Vec::new();
    render(&mut e, &mut buf, 2, &midi(&[MidiEvent::note_on(0, 0, 60, 100)])).unwrap();
    let voices = e.generator().voices();
    assert_eq!(voices.len(), 4);
    assert!(voices.iter().all(|v| v.elapsed() == 0 && v.state() == VoiceState::Active));
    assert_eq!(e.state(), EngineState::Sounding);
}

#[test]
fn every_channel_gets_the_mono_value() {
    let mut e = engine(SynthConfig::default().with_waveform(Waveform::Triangle));
    let mut buf = vec![0.0f32; 3 * 100];
    render(&mut e, &mut buf, 3, &midi(&[MidiEvent::note_on(7, 0, 57, 90)])).unwrap();
    let (l, rest) = buf.split_at(100);
    let (c, r) = rest.split_at(100);
    for i in 0..100 {
        assert_eq!(l[i].to_bits(), c[i].to_bits());
        assert_eq!(l[i].to_bits(), r[i].to_bits());
    }
    assert!(l[..7].iter().all(|&s| s == 0.0));
    assert!(l[8..].iter().any(|&s| s != 0.0));
}

#[test]
fn sawtooth_first_sample_is_scaled_minus_one() {
    let mut e = engine(SynthConfig::default().with_chord([0]).with_waveform(Waveform::Sawtooth));
    let mut buf = vec![0.0f32; 16];
    render(&mut e, &mut buf, 1, &midi(&[MidiEvent::note_on(0, 0, 60, 127)])).unwrap();
    assert!((buf[0] + 0.8).abs() < 1e-6, "got {}", buf[0]);
}

#[test]
fn sine_sample_follows_phase_and_decay() {
    let mut e = engine(SynthConfig::default().with_chord([0]));
    let mut buf = vec![0.0f32; 4];
    render(&mut e, &mut buf, 1, &midi(&[MidiEvent::note_on(0, 0, 69, 127)])).unwrap();
    let sr = f64::from(SR);
    let expected = (TAU * 440.0 / sr).sin() * (-5.0 / sr).exp() * 0.8;
    assert_eq!(buf[0], 0.0);
    assert!((f64::from(buf[1]) - expected).abs() < 1e-6);
}

#[test]
fn rendered_level_falls_to_one_over_e_after_a_fifth_second() {
    let mut e = engine(SynthConfig::default().with_chord([0]).with_waveform(Waveform::Square));
    let n = (SR / 5.0) as usize;
    let mut buf = vec![0.0f32; n + 1];
    render(&mut e, &mut buf, 1, &midi(&[MidiEvent::note_on(0, 0, 60, 127)])).unwrap();
    assert!((buf[0] - 0.8).abs() < 1e-6);
    let ratio = f64::from(buf[n].abs()) / f64::from(buf[0].abs());
    assert!((ratio - (-1.0f64).exp()).abs() < 1e-5, "ratio {ratio}");
}

#[test]
fn trailing_partial_record_is_ignored() {
    let mut bytes = midi(&[MidiEvent::note_on(0, 0, 60, 100)]);
    bytes.extend_from_slice(&[0, 0, 0, 0, 0x90]);
    let mut e = engine(SynthConfig::default());
    let mut buf = vec![0.0f32; 64];
    assert_eq!(render(&mut e, &mut buf, 2, &bytes), Ok(STATUS_CONTINUE));
    assert_eq!(e.generator().voices().len(), 4);

    let mut lone = engine(SynthConfig::default());
    assert_eq!(render(&mut lone, &mut buf, 2, &[1, 2, 3, 4, 5]), Ok(STATUS_CONTINUE));
    assert!(lone.generator().voices().is_empty());
}

#[test]
fn bad_configuration_leaves_buffer_untouched() {
    let mut e = engine(SynthConfig::default());
    let bytes = midi(&[MidiEvent::note_on(0, 0, 60, 100)]);
    let mut buf = vec![0.25f32; 32];
    assert_eq!(render(&mut e, &mut buf, 0, &bytes), Err(EngineError::ZeroChannels));
    let mut block = Block::new(&mut buf, 2, f32::INFINITY, &bytes);
    assert!(matches!(e.render(&mut block), Err(EngineError::InvalidSampleRate(_))));
    assert!(buf.iter().all(|&s| s == 0.25));
    assert!(e.generator().voices().is_empty());
    assert_eq!(EngineError::ZeroChannels.status_code(), -1);
}

#[test]
fn channel_remainder_is_left_alone() {
    let mut e = engine(SynthConfig::default());
    let mut buf = vec![0.5f32; 7];
    render(&mut e, &mut buf, 2, &midi(&[MidiEvent::note_on(0, 0, 60, 100)])).unwrap();
    assert_eq!(buf[6], 0.5);
    assert_eq!(buf[..3], buf[3..6]);
}

#[test]
fn late_onset_carries_into_next_block() {
    let mut e = engine(SynthConfig::default().with_chord([0]));
    let mut buf = vec![0.0f32; 64];
    render(&mut e, &mut buf, 1, &midi(&[MidiEvent::note_on(100, 0, 60, 127)])).unwrap();
    assert!(buf.iter().all(|&s| s == 0.0));
    assert_eq!(e.generator().voices().get(60).map(|v| v.onset()), Some(36));

    render(&mut e, &mut buf, 1, &[]).unwrap();
    let v = e.generator().voices().get(60).copied().unwrap();
    assert_eq!(v.onset(), 0);
    assert_eq!(v.elapsed(), 28);
    assert_eq!(e.time(), 128);
}

#[test]
fn voice_state_persists_between_blocks() {
    let mut e = engine(SynthConfig::default());
    let mut buf = vec![0.0f32; 32];
    render(&mut e, &mut buf, 1, &midi(&[MidiEvent::note_on(0, 0, 60, 100)])).unwrap();
    render(&mut e, &mut buf, 1, &[]).unwrap();
    assert!(e.generator().voices().iter().all(|v| v.elapsed() == 64));
}

#[test]
fn retain_policy_keeps_decayed_voices_forever() {
    let mut e = engine(SynthConfig::default().with_decay_rate(1000.0));
    let mut buf = vec![0.0f32; 4096];
    render(&mut e, &mut buf, 1, &midi(&[MidiEvent::note_on(0, 0, 60, 100)])).unwrap();
    assert_eq!(e.generator().voices().len(), 4);
    assert_eq!(e.generator().voices().active_count(), 0);
    assert_eq!(e.state(), EngineState::Sounding);
    assert_eq!(*buf.last().unwrap(), 0.0);
}

#[test]
fn decay_policy_returns_to_idle() {
    let config = SynthConfig::default()
        .with_decay_rate(1000.0)
        .with_removal(RemovalPolicy { on_decayed: true, ..RemovalPolicy::RETAIN });
    let mut e = engine(config);
    let mut buf = vec![0.0f32; 4096];
    render(&mut e, &mut buf, 1, &midi(&[MidiEvent::note_on(0, 0, 60, 100)])).unwrap();
    assert_eq!(e.state(), EngineState::Idle);
}

#[test]
fn note_off_policy_cuts_at_event_time() {
    let config = SynthConfig::default().with_removal(RemovalPolicy { on_note_off: true, ..RemovalPolicy::RETAIN });
    let mut e = engine(config);
    let mut buf = vec![0.0f32; 64];
    let bytes = midi(&[MidiEvent::note_on(0, 0, 60, 100), MidiEvent::note_off(32, 0, 60, 64)]);
    render(&mut e, &mut buf, 1, &bytes).unwrap();
    assert!(buf[1..32].iter().any(|&s| s != 0.0));
    assert!(buf[32..].iter().all(|&s| s == 0.0));
    assert_eq!(e.state(), EngineState::Idle);
}

#[test]
fn note_off_in_later_block_is_carried() {
    let config = SynthConfig::default().with_removal(RemovalPolicy { on_note_off: true, ..RemovalPolicy::RETAIN });
    let mut e = engine(config);
    let mut buf = vec![0.0f32; 64];
    render(&mut e, &mut buf, 1, &midi(&[MidiEvent::note_on(0, 0, 60, 100)])).unwrap();
    render(&mut e, &mut buf, 1, &midi(&[MidiEvent::note_off(10, 0, 60, 0)])).unwrap();
    assert!(buf[..10].iter().any(|&s| s != 0.0));
    assert!(buf[10..].iter().all(|&s| s == 0.0));
}

#[test]
fn retriggering_restarts_the_envelope() {
    let mut e = engine(SynthConfig::default().with_chord([0]));
    let mut buf = vec![0.0f32; 64];
    let on = midi(&[MidiEvent::note_on(0, 0, 60, 100)]);
    render(&mut e, &mut buf, 1, &on).unwrap();
    render(&mut e, &mut buf, 1, &on).unwrap();
    assert_eq!(e.generator().voices().get(60).map(|v| v.elapsed()), Some(64));
}

#[test]
fn out_of_range_companions_are_skipped() {
    let mut e = engine(SynthConfig::default().with_chord([-5, 0, 9]));
    let mut buf = vec![0.0f32; 8];
    let bytes = midi(&[MidiEvent::note_on(0, 0, 2, 100), MidiEvent::note_on(0, 0, 250, 100)]);
    render(&mut e, &mut buf, 1, &bytes).unwrap();
    let mut keys: Vec<u8> = e.generator().voices().iter().map(|v| v.key()).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec![2, 11, 245, 250]);
    assert!(buf.iter().all(|s| s.is_finite()));
}

#[test]
fn midi_passes_through_unless_replaced() {
    let mut e = engine(SynthConfig::default());
    let mut buf = vec![0.0f32; 8];
    let bytes = midi(&[MidiEvent::note_on(0, 0, 60, 100)]);
    let mut block = Block::new(&mut buf, 1, SR, &bytes);
    e.render(&mut block).unwrap();
    let out = block.into_midi();
    assert!(!out.is_replaced());
    assert_eq!(out.bytes(), &bytes[..]);
}

#[test]
fn reset_clears_voices_and_clock() {
    let mut e = engine(SynthConfig::default());
    let mut buf = vec![0.0f32; 8];
    render(&mut e, &mut buf, 1, &midi(&[MidiEvent::note_on(0, 0, 60, 100)])).unwrap();
    e.reset();
    assert_eq!(e.state(), EngineState::Idle);
    assert_eq!(e.time(), 0);
    render(&mut e, &mut buf, 1, &[]).unwrap();
    assert!(buf.iter().all(|&s| s == 0.0));
}

#[test]
fn sample_rate_change_keeps_voices() {
    let mut e = engine(SynthConfig::default());
    let mut buf = vec![0.0f32; 8];
    render(&mut e, &mut buf, 1, &midi(&[MidiEvent::note_on(0, 0, 60, 100)])).unwrap();
    let mut block = Block::new(&mut buf, 1, 44_100.0, &[]);
    e.render(&mut block).unwrap();
    assert_eq!(e.sample_rate(), 44_100.0);
    assert_eq!(e.generator().voices().len(), 4);
}
