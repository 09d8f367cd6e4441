//! ByteTrack 算法实现
//! ByteTrack: Simple and effective multi-object tracking
//!
//! 核心思想:
//! 1. 高低分检测框分开处理
//! 2. 高分框优先匹配 (IOU)
//! 3. 低分框救援丢失的轨迹
//! 4. 纯运动模型,无需外观特征

use super::tracker::{compute_iou, KalmanBoxFilter, Tracker};
use super::types::{BBox, Detection};
use crate::config::TrackerConfig;

/// ByteTrack 跟踪对象
#[derive(Clone, Debug)]
struct Track {
    id: u32,
    kalman: KalmanBoxFilter,
    frames_lost: u32,
}

impl Track {
    fn new(id: u32, bbox: &BBox, config: &TrackerConfig) -> Self {
        Self {
            id,
            kalman: KalmanBoxFilter::new(
                bbox,
                config.kalman_process_noise,
                config.kalman_obs_noise,
                config.kalman_velocity_decay,
                config.kalman_stationary_threshold,
            ),
            frames_lost: 0,
        }
    }

    fn update(&mut self, bbox: &BBox) {
        self.kalman.update(bbox);
        self.frames_lost = 0;
    }

    fn mark_lost(&mut self) {
        self.frames_lost += 1;
    }
}

/// ByteTrack 追踪器
pub struct ByteTracker {
    tracks: Vec<Track>,
    next_id: u32,
    config: TrackerConfig,
}

impl ByteTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            tracks: Vec::new(),
            next_id: 1,
            config,
        }
    }

    /// IOU 贪心匹配, 返回 (检测索引, 轨迹索引)
    fn match_detections_to_tracks(
        &self,
        detections: &[(usize, &BBox)],
        track_indices: &[usize],
        iou_threshold: f32,
    ) -> Vec<(usize, usize)> {
        if detections.is_empty() || track_indices.is_empty() {
            return Vec::new();
        }

        let mut candidates = Vec::new();
        for (local_det, (det_idx, det)) in detections.iter().enumerate() {
            for (local_track, &track_idx) in track_indices.iter().enumerate() {
                let iou = compute_iou(det, &self.tracks[track_idx].kalman.predicted_bbox());
                if iou >= iou_threshold {
                    candidates.push((1.0 - iou, *det_idx, local_det, track_idx, local_track));
                }
            }
        }

        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut assignments = Vec::new();
        let mut used_det = vec![false; detections.len()];
        let mut used_track = vec![false; track_indices.len()];
        for (_, det_idx, local_det, track_idx, local_track) in candidates {
            if !used_det[local_det] && !used_track[local_track] {
                assignments.push((det_idx, track_idx));
                used_det[local_det] = true;
                used_track[local_track] = true;
            }
        }
        assignments
    }
}

impl Default for ByteTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

impl Tracker for ByteTracker {
    /// 更新跟踪 (ByteTrack 三步匹配)
    fn update(&mut self, detections: &[BBox]) -> Vec<Detection> {
        // 1. 所有轨迹先预测
        for track in &mut self.tracks {
            track.kalman.predict();
        }

        // 2. 分离高低分检测框
        let mut high_dets = Vec::new();
        let mut low_dets = Vec::new();
        for (idx, det) in detections.iter().enumerate() {
            if det.confidence >= self.config.high_score_threshold {
                high_dets.push((idx, det));
            } else if det.confidence >= self.config.low_score_threshold {
                low_dets.push((idx, det));
            }
        }

        let mut det_track: Vec<Option<u32>> = vec![None; detections.len()];
        let mut matched_track = vec![false; self.tracks.len()];

        // 3. 第一轮匹配: 高分检测 + 所有轨迹
        let all_tracks: Vec<usize> = (0..self.tracks.len()).collect();
        let assignments =
            self.match_detections_to_tracks(&high_dets, &all_tracks, self.config.high_iou_threshold);
        for (det_idx, track_idx) in assignments {
            matched_track[track_idx] = true;
            self.tracks[track_idx].update(&detections[det_idx]);
            det_track[det_idx] = Some(self.tracks[track_idx].id);
        }

        // 4. 第二轮匹配: 低分检测 + 未匹配的轨迹 (救援)
        let unmatched: Vec<usize> = (0..self.tracks.len())
            .filter(|&idx| !matched_track[idx])
            .collect();
        let low_assignments =
            self.match_detections_to_tracks(&low_dets, &unmatched, self.config.low_iou_threshold);
        for (det_idx, track_idx) in low_assignments {
            matched_track[track_idx] = true;
            self.tracks[track_idx].update(&detections[det_idx]);
            det_track[det_idx] = Some(self.tracks[track_idx].id);
        }

        // 5. 未匹配的轨迹 → 标记丢失
        for (track, matched) in self.tracks.iter_mut().zip(matched_track) {
            if !matched {
                track.mark_lost();
            }
        }

        // 6. 未匹配的高分检测 → 新建轨迹
        for (det_idx, det) in detections.iter().enumerate() {
            if det_track[det_idx].is_none() && det.confidence >= self.config.high_score_threshold {
                let track = Track::new(self.next_id, det, &self.config);
                det_track[det_idx] = Some(track.id);
                self.tracks.push(track);
                self.next_id += 1;
            }
        }

        // 7. 删除丢失太久的轨迹
        let max_lost = self.config.max_lost_frames;
        self.tracks.retain(|t| t.frames_lost <= max_lost);

        detections
            .iter()
            .cloned()
            .zip(det_track)
            .map(|(bbox, track_id)| Detection::new(bbox, track_id))
            .collect()
    }

    fn reset(&mut self) {
        self.tracks.clear();
        self.next_id = 1;
    }

    fn track_count(&self) -> usize {
        self.tracks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_is_stable_for_moving_box() {
        let mut tracker = ByteTracker::default();
        let mut ids = Vec::new();
        for step in 0..10 {
            let x = 100.0 + step as f32 * 3.0;
            let out = tracker.update(&[BBox::person(x, 100.0, x + 60.0, 260.0, 0.9)]);
            ids.push(out[0].track_id);
        }
        assert!(ids.iter().all(|id| *id == Some(1)));
    }

    #[test]
    fn test_low_score_detection_does_not_spawn_track() {
        let mut tracker = ByteTracker::default();
        let out = tracker.update(&[BBox::person(0.0, 0.0, 50.0, 100.0, 0.2)]);
        assert_eq!(out[0].track_id, None);
        assert_eq!(tracker.track_count(), 0);
    }

    #[test]
    fn test_two_people_get_distinct_ids_and_reset_clears() {
        let mut tracker = ByteTracker::default();
        let out = tracker.update(&[
            BBox::person(0.0, 0.0, 50.0, 100.0, 0.9),
            BBox::person(500.0, 0.0, 550.0, 100.0, 0.9),
        ]);
        assert_ne!(out[0].track_id, out[1].track_id);
        assert_eq!(tracker.track_count(), 2);

        tracker.reset();
        assert_eq!(tracker.track_count(), 0);
    }

    #[test]
    fn test_lost_track_expires() {
        let config = TrackerConfig {
            max_lost_frames: 2,
            ..TrackerConfig::default()
        };
        let mut tracker = ByteTracker::new(config);
        tracker.update(&[BBox::person(0.0, 0.0, 50.0, 100.0, 0.9)]);
        for _ in 0..3 {
            tracker.update(&[]);
        }
        assert_eq!(tracker.track_count(), 0);
    }
}
